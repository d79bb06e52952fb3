//! Material-class render batches
//!
//! Drawable geometry is bucketed by material class. Each batch holds the
//! interleaved vertices and indices of every sub-mesh in its class, one indirect
//! draw command per sub-mesh, and a per-draw material table indexed by draw id:
//! - flat batches carry one RGBA color per draw
//! - textured and emissive batches carry one bindless texture slot per draw
//!
//! The three batches share a single indirect buffer laid out Flat, Textured,
//! Emissive; [`BatchSet::layout`] reports each batch's byte offset and command count
//! so the whole class is submitted with one multi-draw call.

use bytemuck::{Pod, Zeroable};

use super::vertex::Vertex;

/// Shading family of a sub-mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialClass {
    /// Untextured, colored by the material's diffuse constant
    Flat,
    /// Diffuse texture with lighting
    Textured,
    /// Diffuse texture treated as self-illuminated
    Emissive,
}

impl MaterialClass {
    /// Every class in indirect buffer order
    pub const ALL: [MaterialClass; 3] = [Self::Flat, Self::Textured, Self::Emissive];

    /// Position in [`MaterialClass::ALL`]
    pub fn index(self) -> usize {
        match self {
            Self::Flat => 0,
            Self::Textured => 1,
            Self::Emissive => 2,
        }
    }

    /// Fragment shader variant selected through a specialization constant
    pub fn shader_variant(self) -> u32 {
        match self {
            Self::Flat => 0,
            Self::Textured => 1,
            Self::Emissive => 2,
        }
    }

    /// Whether the class samples the bindless texture table
    pub fn is_textured(self) -> bool {
        !matches!(self, Self::Flat)
    }
}

/// Layout-compatible with `VkDrawIndexedIndirectCommand`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawIndexedIndirectCommand {
    /// Indices drawn
    pub index_count: u32,
    /// Instances drawn
    pub instance_count: u32,
    /// First index within the batch index buffer
    pub first_index: u32,
    /// Added to every index before fetching a vertex
    pub vertex_offset: i32,
    /// First slot in the instance transform buffer
    pub first_instance: u32,
}

impl DrawIndexedIndirectCommand {
    /// Byte stride of one command
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;
}

/// Material of a single sub-mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubMeshMaterial {
    /// Flat RGBA color
    Color([f32; 4]),
    /// Bindless texture slot
    Texture(u32),
}

/// Per-draw bindless texture slots, mutable after load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureHandles {
    slots: Vec<u32>,
    dirty: bool,
}

impl TextureHandles {
    /// Wrap initial slots; the GPU copy is written at upload so they start clean
    pub fn new(slots: Vec<u32>) -> Self {
        Self { slots, dirty: false }
    }

    /// Point draw `draw_id` at texture `slot`
    ///
    /// Returns false and changes nothing if the draw does not exist.
    pub fn set(&mut self, draw_id: u32, slot: u32) -> bool {
        match self.slots.get_mut(draw_id as usize) {
            Some(current) => {
                if *current != slot {
                    *current = slot;
                    self.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    /// Texture slot of draw `draw_id`
    pub fn get(&self, draw_id: u32) -> Option<u32> {
        self.slots.get(draw_id as usize).copied()
    }

    /// All slots in draw order
    pub fn as_slice(&self) -> &[u32] {
        &self.slots
    }

    /// Number of draws
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no draws
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether a slot changed since the last upload
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge the upload
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn push(&mut self, slot: u32) {
        self.slots.push(slot);
    }
}

/// Geometry and draw commands for one material class
#[derive(Debug, Clone)]
pub struct RenderBatch {
    class: MaterialClass,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    commands: Vec<DrawIndexedIndirectCommand>,
    colors: Vec<[f32; 4]>,
    textures: TextureHandles,
}

impl RenderBatch {
    /// Empty batch
    pub fn new(class: MaterialClass) -> Self {
        Self {
            class,
            vertices: Vec::new(),
            indices: Vec::new(),
            commands: Vec::new(),
            colors: Vec::new(),
            textures: TextureHandles::default(),
        }
    }

    /// Append a sub-mesh drawn `instance_count` times from `base_instance`
    ///
    /// `indices` are local to `vertices`; the command's `vertex_offset` rebases them.
    /// Returns the draw id, the command's position within this batch.
    pub fn push_sub_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
        instance_count: u32,
        base_instance: u32,
        material: SubMeshMaterial,
    ) -> u32 {
        let draw_id = self.commands.len() as u32;

        self.commands.push(DrawIndexedIndirectCommand {
            index_count: indices.len() as u32,
            instance_count,
            first_index: self.indices.len() as u32,
            vertex_offset: self.vertices.len() as i32,
            first_instance: base_instance,
        });
        self.vertices.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);

        match material {
            SubMeshMaterial::Color(color) => self.colors.push(color),
            SubMeshMaterial::Texture(slot) => self.textures.push(slot),
        }

        draw_id
    }

    /// Material class
    pub fn class(&self) -> MaterialClass {
        self.class
    }

    /// Interleaved vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Indices, local to each command's vertex range
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Indirect commands in draw id order
    pub fn commands(&self) -> &[DrawIndexedIndirectCommand] {
        &self.commands
    }

    /// Flat colors in draw id order
    pub fn colors(&self) -> &[[f32; 4]] {
        &self.colors
    }

    /// Texture slots in draw id order
    pub fn textures(&self) -> &TextureHandles {
        &self.textures
    }

    /// Mutable texture slots
    pub fn textures_mut(&mut self) -> &mut TextureHandles {
        &mut self.textures
    }

    /// Whether the batch has nothing to draw
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Where a batch's commands sit in the shared indirect buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    /// Batch class
    pub class: MaterialClass,
    /// Byte offset of the first command
    pub offset: u64,
    /// Number of commands
    pub count: u32,
}

/// The three material batches
#[derive(Debug, Clone)]
pub struct BatchSet {
    batches: [RenderBatch; 3],
}

impl BatchSet {
    /// Three empty batches
    pub fn new() -> Self {
        Self {
            batches: MaterialClass::ALL.map(RenderBatch::new),
        }
    }

    /// Batch for `class`
    pub fn get(&self, class: MaterialClass) -> &RenderBatch {
        &self.batches[class.index()]
    }

    /// Mutable batch for `class`
    pub fn get_mut(&mut self, class: MaterialClass) -> &mut RenderBatch {
        &mut self.batches[class.index()]
    }

    /// Batches in indirect buffer order
    pub fn iter(&self) -> impl Iterator<Item = &RenderBatch> {
        self.batches.iter()
    }

    /// All commands concatenated Flat, Textured, Emissive
    pub fn indirect_commands(&self) -> Vec<DrawIndexedIndirectCommand> {
        self.batches.iter().flat_map(|b| b.commands().iter().copied()).collect()
    }

    /// Byte offset and count of every batch's commands
    pub fn layout(&self) -> Vec<BatchRange> {
        let mut offset = 0u64;
        self.batches
            .iter()
            .map(|batch| {
                let count = batch.commands().len() as u32;
                let range = BatchRange { class: batch.class(), offset, count };
                offset += u64::from(count) * u64::from(DrawIndexedIndirectCommand::STRIDE);
                range
            })
            .collect()
    }

    /// Total number of indirect commands
    pub fn command_count(&self) -> usize {
        self.batches.iter().map(|b| b.commands().len()).sum()
    }
}

impl Default for BatchSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vertex>, Vec<u32>) {
        (vec![Vertex::default(); 4], vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_offsets_accumulate_within_class() {
        let (vertices, indices) = quad();
        let mut batch = RenderBatch::new(MaterialClass::Textured);

        assert_eq!(batch.push_sub_mesh(&vertices, &indices, 2, 0, SubMeshMaterial::Texture(1)), 0);
        assert_eq!(batch.push_sub_mesh(&vertices[..3], &indices[..3], 1, 2, SubMeshMaterial::Texture(2)), 1);

        let second = batch.commands()[1];
        assert_eq!(second.first_index, 6);
        assert_eq!(second.vertex_offset, 4);
        assert_eq!(second.first_instance, 2);
        assert_eq!(second.index_count, 3);
        assert_eq!(batch.textures().as_slice(), &[1, 2]);
        assert!(batch.colors().is_empty());
    }

    #[test]
    fn test_layout_orders_flat_textured_emissive() {
        let (vertices, indices) = quad();
        let mut set = BatchSet::new();
        set.get_mut(MaterialClass::Emissive)
            .push_sub_mesh(&vertices, &indices, 1, 0, SubMeshMaterial::Texture(3));
        set.get_mut(MaterialClass::Flat)
            .push_sub_mesh(&vertices, &indices, 1, 0, SubMeshMaterial::Color([1.0; 4]));
        set.get_mut(MaterialClass::Flat)
            .push_sub_mesh(&vertices, &indices, 1, 1, SubMeshMaterial::Color([0.5; 4]));

        let layout = set.layout();
        let stride = u64::from(DrawIndexedIndirectCommand::STRIDE);
        assert_eq!(layout[0], BatchRange { class: MaterialClass::Flat, offset: 0, count: 2 });
        assert_eq!(layout[1], BatchRange { class: MaterialClass::Textured, offset: 2 * stride, count: 0 });
        assert_eq!(layout[2], BatchRange { class: MaterialClass::Emissive, offset: 2 * stride, count: 1 });

        let commands = set.indirect_commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[2].first_instance, 0);
        assert_eq!(set.command_count(), 3);
    }

    #[test]
    fn test_texture_handles_track_changes() {
        let mut handles = TextureHandles::new(vec![4, 5]);
        assert!(!handles.is_dirty());
        assert!(handles.set(1, 5));
        assert!(!handles.is_dirty());
        assert!(handles.set(1, 9));
        assert!(handles.is_dirty());
        assert!(!handles.set(7, 1));
        assert_eq!(handles.get(1), Some(9));
        handles.mark_clean();
        assert!(!handles.is_dirty());
    }

    #[test]
    fn test_command_stride_matches_vulkan() {
        assert_eq!(DrawIndexedIndirectCommand::STRIDE, 20);
    }
}
