//! Frame pipeline
//!
//! Runs the fixed pass sequence every frame:
//! 1. update: camera block, dirty instance transforms, changed texture slots
//! 2. geometry: stencil-writing room, one multi-draw per material batch, then
//!    the foreground quad where the stencil was not written
//! 3. debug lines when the draw mode asks for them
//! 4. bloom: bright-pass extract, horizontal blur, vertical blur
//! 5. composite into the swapchain image
//!
//! Backend failures are returned to the caller, which logs them and carries on
//! with the next frame.

use bitflags::bitflags;
use log::{info, trace, warn};

use crate::assets::SceneGeometry;
use crate::ecs::components::{GeometryInstance, Transform};
use crate::ecs::{DrawMode, SimContext, World};

use super::api::{CameraUniform, PassCommand, RenderBackend};
use super::batch::{BatchRange, MaterialClass};
use super::bloom::{gaussian_weights, BlurDirection, SIGMA_SQUARED};
use super::vertex::{InstanceTransform, LineVertex};
use super::RenderResult;

bitflags! {
    /// Passes enabled for a frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PassSet: u32 {
        /// Stencil-writing room geometry
        const ROOM = 1 << 0;
        /// Material batches
        const BATCHES = 1 << 1;
        /// Stencil-tested foreground quad
        const BACKGROUND = 1 << 2;
        /// Physics wireframes
        const DEBUG = 1 << 3;
        /// Extract and blur
        const BLOOM = 1 << 4;
        /// Final resolve
        const COMPOSITE = 1 << 5;
    }
}

impl PassSet {
    /// Passes a draw mode runs; bloom and composite always run
    pub fn for_mode(mode: DrawMode) -> Self {
        let mut passes = Self::BLOOM | Self::COMPOSITE;
        if mode.draws_scene() {
            passes |= Self::ROOM | Self::BATCHES | Self::BACKGROUND;
        }
        if mode.draws_debug() {
            passes |= Self::DEBUG;
        }
        passes
    }
}

/// What the update stage wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Instance transforms rewritten
    pub transforms: usize,
    /// Batches whose texture slots were rewritten
    pub texture_tables: usize,
    /// Whether the foreground quad was rewritten
    pub background: bool,
}

/// Pass sequencer over a [`RenderBackend`]
#[derive(Debug)]
pub struct RenderPipeline {
    layout: Vec<BatchRange>,
    has_room: bool,
    instance_count: usize,
    frame_index: u64,
}

impl RenderPipeline {
    /// Upload `scene` and the blur kernel
    pub fn new(backend: &mut dyn RenderBackend, scene: &SceneGeometry) -> RenderResult<Self> {
        backend.upload_scene(scene)?;
        backend.set_blur_weights(&gaussian_weights(SIGMA_SQUARED))?;

        let layout = scene.batches.layout();
        for range in &layout {
            info!("{:?} batch: {} draw commands at offset {}", range.class, range.count, range.offset);
        }

        Ok(Self {
            layout,
            has_room: scene.room.is_some(),
            instance_count: scene.instance_count(),
            frame_index: 0,
        })
    }

    /// Frames submitted so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Update stage: push CPU-side changes to the backend
    ///
    /// The whole instance block is mapped once and every dirty transform is
    /// written into its slot; each flag is cleared right after its write.
    pub fn sync(
        &mut self,
        backend: &mut dyn RenderBackend,
        context: &SimContext,
        world: &mut World,
        scene: &mut SceneGeometry,
    ) -> RenderResult<SyncStats> {
        let mut stats = SyncStats::default();
        backend.write_camera(&CameraUniform::from_context(context))?;

        if world.query::<Transform>().any(|(_, transform)| transform.is_dirty()) {
            let instance_count = self.instance_count;
            let written = &mut stats.transforms;
            backend.write_instance_transforms(&mut |block: &mut [InstanceTransform]| {
                world.query_pair_mut::<Transform, GeometryInstance>(|entity, transform, instance| {
                    if !transform.is_dirty() {
                        return;
                    }
                    match block.get_mut(instance.slot() as usize) {
                        Some(slot) => {
                            *slot = (*transform.model()).into();
                            transform.mark_clean();
                            *written += 1;
                        }
                        None => warn!(
                            "{:?} instance slot {} outside block of {}",
                            entity,
                            instance.slot(),
                            instance_count
                        ),
                    }
                });
            })?;
        }

        for class in MaterialClass::ALL.into_iter().filter(|class| class.is_textured()) {
            let handles = scene.batches.get_mut(class).textures_mut();
            if handles.is_dirty() {
                backend.write_texture_handles(class, handles.as_slice())?;
                handles.mark_clean();
                stats.texture_tables += 1;
            }
        }

        if scene.background.is_dirty() {
            backend.write_background(&scene.background.vertices())?;
            scene.background.mark_clean();
            stats.background = true;
        }

        Ok(stats)
    }

    /// Passes to record for `passes`, in submission order
    pub fn commands(&self, passes: PassSet, debug_vertex_count: usize) -> Vec<PassCommand> {
        let mut commands = Vec::with_capacity(8);

        if passes.contains(PassSet::ROOM) && self.has_room {
            commands.push(PassCommand::StencilRoom);
        }
        if passes.contains(PassSet::BATCHES) {
            commands.extend(self.layout.iter().filter(|range| range.count > 0).copied().map(PassCommand::Batch));
        }
        if passes.contains(PassSet::BACKGROUND) {
            commands.push(PassCommand::Background);
        }
        if passes.contains(PassSet::DEBUG) && debug_vertex_count > 0 {
            commands.push(PassCommand::DebugLines {
                vertex_count: debug_vertex_count as u32,
            });
        }
        if passes.contains(PassSet::BLOOM) {
            commands.push(PassCommand::BloomExtract);
            commands.push(PassCommand::Blur(BlurDirection::Horizontal));
            commands.push(PassCommand::Blur(BlurDirection::Vertical));
        }
        if passes.contains(PassSet::COMPOSITE) {
            commands.push(PassCommand::Composite);
        }
        commands
    }

    /// Sync, record and present one frame
    ///
    /// `debug_lines` is only uploaded when the draw mode shows it. Returns false
    /// when the backend skipped the frame.
    pub fn render_frame(
        &mut self,
        backend: &mut dyn RenderBackend,
        context: &SimContext,
        world: &mut World,
        scene: &mut SceneGeometry,
        debug_lines: &[LineVertex],
    ) -> RenderResult<bool> {
        let stats = self.sync(backend, context, world, scene)?;
        let passes = PassSet::for_mode(context.draw_mode);

        let debug_vertex_count = if passes.contains(PassSet::DEBUG) {
            backend.write_debug_lines(debug_lines)?;
            debug_lines.len()
        } else {
            0
        };

        if !backend.begin_frame()? {
            trace!("Frame {} skipped by backend", self.frame_index);
            return Ok(false);
        }
        for command in self.commands(passes, debug_vertex_count) {
            backend.record(command)?;
        }
        backend.end_frame()?;

        trace!("Frame {} submitted: {:?}", self.frame_index, stats);
        self.frame_index += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StencilMesh;
    use crate::config::ProjectionSettings;
    use crate::ecs::Entity;
    use crate::foundation::math::{Mat4, Vec3};
    use crate::render::api::recording::{Call, RecordingBackend};
    use crate::render::batch::{BatchSet, SubMeshMaterial};
    use crate::render::vertex::Vertex;
    use crate::render::{BackgroundQuad, TextureTable};
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn scene() -> SceneGeometry {
        let triangle = [Vertex::default(); 3];
        let mut batches = BatchSet::new();
        batches
            .get_mut(MaterialClass::Flat)
            .push_sub_mesh(&triangle, &[0, 1, 2], 2, 0, SubMeshMaterial::Color([1.0; 4]));
        batches
            .get_mut(MaterialClass::Emissive)
            .push_sub_mesh(&triangle, &[0, 1, 2], 1, 2, SubMeshMaterial::Texture(1));

        SceneGeometry {
            batches,
            instance_transforms: vec![Mat4::identity().into(); 3],
            textures: TextureTable::new(),
            room: Some(StencilMesh::default()),
            background: BackgroundQuad::new(0),
            display_draws: BTreeMap::new(),
            instances: BTreeMap::new(),
        }
    }

    fn world() -> (World, Vec<Entity>) {
        let mut world = World::new();
        let entities = (0..3)
            .map(|slot| {
                let entity = world.create_entity();
                world.add_component(entity, Transform::default());
                world.add_component(entity, GeometryInstance { base_instance: 0, instance_id: slot });
                entity
            })
            .collect();
        (world, entities)
    }

    fn context(mode: DrawMode) -> SimContext {
        let mut context = SimContext::new(&ProjectionSettings::default(), (800, 800));
        context.draw_mode = mode;
        context
    }

    #[test]
    fn test_normal_mode_pass_order() {
        let mut backend = RecordingBackend::new();
        let mut scene = scene();
        let (mut world, _) = world();
        let mut pipeline = RenderPipeline::new(&mut backend, &scene).unwrap();

        let lines = [LineVertex::default(); 2];
        assert!(pipeline
            .render_frame(&mut backend, &context(DrawMode::Normal), &mut world, &mut scene, &lines)
            .unwrap());

        let layout = scene.batches.layout();
        assert_eq!(
            backend.passes(),
            vec![
                PassCommand::StencilRoom,
                PassCommand::Batch(layout[0]),
                PassCommand::Batch(layout[2]),
                PassCommand::Background,
                PassCommand::BloomExtract,
                PassCommand::Blur(BlurDirection::Horizontal),
                PassCommand::Blur(BlurDirection::Vertical),
                PassCommand::Composite,
            ]
        );
        assert_eq!(backend.count(&Call::DebugLines(2)), 0);
        assert_eq!(pipeline.frame_index(), 1);
    }

    #[test]
    fn test_debug_modes() {
        let mut backend = RecordingBackend::new();
        let mut scene = scene();
        let (mut world, _) = world();
        let mut pipeline = RenderPipeline::new(&mut backend, &scene).unwrap();
        let lines = [LineVertex::default(); 4];

        pipeline
            .render_frame(&mut backend, &context(DrawMode::Debug), &mut world, &mut scene, &lines)
            .unwrap();
        assert_eq!(
            backend.passes(),
            vec![
                PassCommand::DebugLines { vertex_count: 4 },
                PassCommand::BloomExtract,
                PassCommand::Blur(BlurDirection::Horizontal),
                PassCommand::Blur(BlurDirection::Vertical),
                PassCommand::Composite,
            ]
        );

        pipeline
            .render_frame(&mut backend, &context(DrawMode::NormalDebug), &mut world, &mut scene, &lines)
            .unwrap();
        let passes = backend.passes();
        assert_eq!(passes.len(), 9);
        assert_eq!(passes[3], PassCommand::Background);
        assert_eq!(passes[4], PassCommand::DebugLines { vertex_count: 4 });
        assert_eq!(backend.count(&Call::DebugLines(4)), 2);
    }

    #[test]
    fn test_dirty_transforms_written_and_cleared() {
        let mut backend = RecordingBackend::new();
        let mut scene = scene();
        let (mut world, entities) = world();
        let mut pipeline = RenderPipeline::new(&mut backend, &scene).unwrap();

        let moved = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        world.get_component_mut::<Transform>(entities[1]).unwrap().set(moved);

        let stats = pipeline
            .sync(&mut backend, &context(DrawMode::Normal), &mut world, &mut scene)
            .unwrap();
        assert_eq!(stats.transforms, 1);
        assert_eq!(backend.transforms[1], <[[f32; 4]; 4]>::from(moved));
        assert_eq!(backend.transforms[0], <[[f32; 4]; 4]>::from(Mat4::identity()));
        assert!(!world.get_component::<Transform>(entities[1]).unwrap().is_dirty());

        // Nothing dirty: the block is not mapped again
        pipeline
            .sync(&mut backend, &context(DrawMode::Normal), &mut world, &mut scene)
            .unwrap();
        assert_eq!(backend.count(&Call::Transforms), 1);
    }

    #[test]
    fn test_changed_texture_slots_and_background_uploaded_once() {
        let mut backend = RecordingBackend::new();
        let mut scene = scene();
        let (mut world, _) = world();
        let mut pipeline = RenderPipeline::new(&mut backend, &scene).unwrap();
        assert_eq!(backend.emissive_slots, vec![1]);

        scene.batches.get_mut(MaterialClass::Emissive).textures_mut().set(0, 7);
        scene.background.scroll(0.1);
        let stats = pipeline
            .sync(&mut backend, &context(DrawMode::Normal), &mut world, &mut scene)
            .unwrap();
        assert_eq!(stats.texture_tables, 1);
        assert!(stats.background);
        assert_eq!(backend.emissive_slots, vec![7]);
        assert_relative_eq!(backend.background.unwrap()[0].tex_coord[1], 0.1);

        let stats = pipeline
            .sync(&mut backend, &context(DrawMode::Normal), &mut world, &mut scene)
            .unwrap();
        assert_eq!(stats, SyncStats::default());
        assert_eq!(backend.count(&Call::TextureHandles(MaterialClass::Emissive)), 1);
    }

    #[test]
    fn test_skipped_frame_still_syncs() {
        let mut backend = RecordingBackend::new();
        backend.skip_frames = true;
        let mut scene = scene();
        let (mut world, entities) = world();
        let mut pipeline = RenderPipeline::new(&mut backend, &scene).unwrap();

        world.get_component_mut::<Transform>(entities[2]).unwrap().set(Mat4::identity() * 2.0);
        let presented = pipeline
            .render_frame(&mut backend, &context(DrawMode::Normal), &mut world, &mut scene, &[])
            .unwrap();
        assert!(!presented);
        assert!(backend.passes().is_empty());
        assert_eq!(backend.count(&Call::EndFrame), 0);
        assert_eq!(backend.count(&Call::Transforms), 1);
        assert_eq!(pipeline.frame_index(), 0);
    }

    #[test]
    fn test_upload_sets_normalized_blur_kernel() {
        let mut backend = RecordingBackend::new();
        RenderPipeline::new(&mut backend, &scene()).unwrap();
        let w = backend.blur_weights.unwrap();
        assert_relative_eq!(w[0] + 2.0 * (w[1] + w[2] + w[3] + w[4]), 1.0, epsilon = 1e-6);
        assert_eq!(backend.calls[0], Call::UploadScene(3));
    }

    #[test]
    fn test_empty_room_and_debug_lines_are_skipped() {
        let mut scene = scene();
        scene.room = None;
        let mut backend = RecordingBackend::new();
        let pipeline = RenderPipeline::new(&mut backend, &scene).unwrap();
        let commands = pipeline.commands(PassSet::for_mode(DrawMode::NormalDebug), 0);
        assert!(!commands.contains(&PassCommand::StencilRoom));
        assert!(!commands.iter().any(|c| matches!(c, PassCommand::DebugLines { .. })));
    }
}
