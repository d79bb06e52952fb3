//! Vertex input layouts for each pipeline
//!
//! Scene meshes read [`Vertex`] from binding 0 and their model matrix from
//! binding 1 at instance rate, so an indirect command's first instance selects
//! the transform slot.

use ash::vk;
use std::mem::size_of;

use crate::render::vertex::{InstanceTransform, LineVertex, QuadVertex, Vertex};

/// Bindings and attributes for one pipeline
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    /// Buffer bindings
    pub bindings: Vec<vk::VertexInputBindingDescription>,
    /// Shader attributes
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl VertexLayout {
    /// Mesh vertices at binding 0, locations 0..=2
    pub fn mesh() -> Self {
        Self {
            bindings: vec![binding(0, size_of::<Vertex>(), vk::VertexInputRate::VERTEX)],
            attributes: vec![
                attribute(0, 0, vk::Format::R32G32B32_SFLOAT, 0),
                attribute(0, 1, vk::Format::R32G32B32_SFLOAT, 12),
                attribute(0, 2, vk::Format::R32G32_SFLOAT, 24),
            ],
        }
    }

    /// Mesh vertices plus a per-instance mat4 at locations 3..=6
    pub fn instanced_mesh() -> Self {
        let mut layout = Self::mesh();
        layout.bindings.push(binding(
            1,
            size_of::<InstanceTransform>(),
            vk::VertexInputRate::INSTANCE,
        ));
        for column in 0..4u32 {
            layout
                .attributes
                .push(attribute(1, 3 + column, vk::Format::R32G32B32A32_SFLOAT, column * 16));
        }
        layout
    }

    /// Foreground quad: position and texture coordinate
    pub fn quad() -> Self {
        Self {
            bindings: vec![binding(0, size_of::<QuadVertex>(), vk::VertexInputRate::VERTEX)],
            attributes: vec![
                attribute(0, 0, vk::Format::R32G32B32_SFLOAT, 0),
                attribute(0, 1, vk::Format::R32G32_SFLOAT, 12),
            ],
        }
    }

    /// Debug lines: position and color
    pub fn lines() -> Self {
        Self {
            bindings: vec![binding(0, size_of::<LineVertex>(), vk::VertexInputRate::VERTEX)],
            attributes: vec![
                attribute(0, 0, vk::Format::R32G32B32_SFLOAT, 0),
                attribute(0, 1, vk::Format::R32G32B32_SFLOAT, 12),
            ],
        }
    }

    /// No vertex input; full-screen passes generate their triangle
    pub fn empty() -> Self {
        Self::default()
    }
}

fn binding(binding: u32, stride: usize, input_rate: vk::VertexInputRate) -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding,
        stride: stride as u32,
        input_rate,
    }
}

fn attribute(binding: u32, location: u32, format: vk::Format, offset: u32) -> vk::VertexInputAttributeDescription {
    vk::VertexInputAttributeDescription {
        binding,
        location,
        format,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_columns_follow_mesh_attributes() {
        let layout = VertexLayout::instanced_mesh();
        assert_eq!(layout.bindings.len(), 2);
        assert_eq!(layout.bindings[1].stride, 64);
        assert_eq!(layout.bindings[1].input_rate, vk::VertexInputRate::INSTANCE);

        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(layout.attributes[6].offset, 48);
    }

    #[test]
    fn test_strides_match_vertex_types() {
        assert_eq!(VertexLayout::mesh().bindings[0].stride, 32);
        assert_eq!(VertexLayout::quad().bindings[0].stride, 20);
        assert_eq!(VertexLayout::lines().bindings[0].stride, 24);
        assert!(VertexLayout::empty().bindings.is_empty());
    }
}
