//! Per-frame uniform data
//!
//! Layouts shared with the GLSL uniform blocks. Matrices are column-major, as
//! nalgebra stores them and as GLSL expects them.

use bytemuck::{Pod, Zeroable};

use crate::ecs::SimContext;
use crate::foundation::math::{Mat4, Mat4Ext};

/// Camera block bound at set 0, binding 0
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// World to view
    pub view: [[f32; 4]; 4],
    /// View to Vulkan clip space
    pub projection: [[f32; 4]; 4],
    /// Eye position, w unused
    pub camera_position: [f32; 4],
}

impl CameraUniform {
    /// Snapshot the context's camera
    ///
    /// The context keeps an OpenGL-style projection; the Vulkan y-flip and depth
    /// remap are applied here so every consumer of the context can stay in one
    /// convention.
    pub fn from_context(context: &SimContext) -> Self {
        let projection = Mat4::vulkan_clip_correction() * context.projection;
        let eye = context.camera_position;
        Self {
            view: context.view.into(),
            projection: projection.into(),
            camera_position: [eye.x, eye.y, eye.z, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectionSettings;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    #[test]
    fn test_projection_is_flipped_for_vulkan() {
        let mut context = SimContext::new(&ProjectionSettings::default(), (800, 800));
        context.camera_position = Vec3::new(1.0, 2.0, 3.0);
        let uniform = CameraUniform::from_context(&context);

        assert_relative_eq!(uniform.projection[1][1], -context.projection[(1, 1)]);
        assert_eq!(uniform.camera_position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
    }
}
