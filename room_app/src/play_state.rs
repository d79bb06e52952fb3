//! Play state
//!
//! Owns the registry, physics, scene and every system subscribed to the input
//! channels, and runs them in frame order: input, camera, picking and physics,
//! display animator, render.

use std::collections::VecDeque;

use log::{debug, error, info};
use room_engine::assets::{SceneGeometry, SceneLoader};
use room_engine::config::ViewerSettings;
use room_engine::ecs::systems::DisplayAnimator;
use room_engine::ecs::{DrawMode, SimContext, World};
use room_engine::events::{AudioCue, EventChannel, InputChannels, Subscription};
use room_engine::input::{InputEvent, InputRouter, StateMessage};
use room_engine::physics::{Picker, PhysicsWorld};
use room_engine::render::{RenderBackend, RenderPipeline, RenderResult};
use room_engine::scene::CameraController;

use crate::audio::AudioSink;

/// Whether the queue asks the play state to end
///
/// Drains every message. Menu and play pushes belong to the state stack and are
/// only logged here.
pub fn drain_messages(messages: &mut VecDeque<StateMessage>) -> bool {
    let mut finished = false;
    while let Some(message) = messages.pop_front() {
        match message {
            StateMessage::Pop | StateMessage::Quit => finished = true,
            StateMessage::PushMainMenu | StateMessage::PushPlay => {
                debug!("Ignoring {:?}; no state stack above the viewer", message);
            }
            StateMessage::None => {}
        }
    }
    finished
}

/// The running room scene
pub struct PlayState {
    pipeline: RenderPipeline,
    animator: DisplayAnimator,
    audio: AudioSink,
    cues: EventChannel<AudioCue>,
    draw_mode: Subscription<DrawMode>,
    picker: Picker,
    camera: CameraController,
    router: InputRouter,
    channels: InputChannels,
    messages: VecDeque<StateMessage>,
    context: SimContext,
    scene: SceneGeometry,
    physics: PhysicsWorld,
    world: World,
}

impl PlayState {
    /// Load the level and upload it to `backend`
    pub fn new(settings: &ViewerSettings, backend: &mut dyn RenderBackend) -> RenderResult<Self> {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&settings.physics);
        let mut loader = SceneLoader::new(&settings.asset_root);
        let mut scene = loader.load(&settings.level_file, &mut world, &mut physics);

        // Glyph textures need slots before the upload
        let animator = DisplayAnimator::new(&loader, &mut scene);
        let pipeline = RenderPipeline::new(backend, &scene)?;

        let mut channels = InputChannels::new();
        let camera = CameraController::new(&settings.camera, &mut channels);
        let picker = Picker::new(&mut channels);
        let draw_mode = channels.draw_mode.subscribe();

        let mut cues = EventChannel::new();
        let audio = AudioSink::new(&mut cues, &settings.asset_root);

        let mut context = SimContext::new(&settings.projection, backend.extent());
        camera.write_view(&mut context);

        info!(
            "Play state ready: {} entities, {} instances, {} bodies",
            world.entity_count(),
            scene.instance_count(),
            physics.body_count()
        );

        Ok(Self {
            pipeline,
            animator,
            audio,
            cues,
            draw_mode,
            picker,
            camera,
            router: InputRouter::new(),
            channels,
            messages: VecDeque::new(),
            context,
            scene,
            physics,
            world,
        })
    }

    /// Start pointer gestures from `(x, y)` until the first motion event
    pub fn seed_cursor(&mut self, x: f32, y: f32) {
        self.router.set_cursor(x, y);
    }

    /// Run one frame; returns false once a queued message ends the state
    pub fn frame<I>(&mut self, events: I, delta_time: f32, backend: &mut dyn RenderBackend) -> bool
    where
        I: IntoIterator<Item = InputEvent>,
    {
        self.router.process(events, &mut self.channels, &mut self.messages);
        if let Some(mode) = self.draw_mode.latest() {
            info!("Draw mode {:?}", mode);
            self.context.draw_mode = mode;
        }

        self.camera.update(delta_time, &mut self.context, &mut self.scene.background);
        self.picker.update(&mut self.physics, &self.context, &mut self.world);
        self.physics.step(delta_time, &mut self.world);

        self.animator.update(delta_time, &mut self.scene, &mut self.cues);
        self.audio.drain();

        let debug_lines = if self.context.draw_mode.draws_debug() {
            self.physics.debug_lines()
        } else {
            Vec::new()
        };
        if let Err(e) = self.pipeline.render_frame(
            backend,
            &self.context,
            &mut self.world,
            &mut self.scene,
            &debug_lines,
        ) {
            error!("Frame {} failed: {}", self.pipeline.frame_index(), e);
        }

        !drain_messages(&mut self.messages)
    }

    /// Unsubscribe every system and tear the physics world down
    pub fn shutdown(self) {
        let Self {
            audio,
            mut cues,
            draw_mode,
            picker,
            camera,
            mut channels,
            mut physics,
            mut world,
            ..
        } = self;

        audio.unsubscribe(&mut cues);
        channels.draw_mode.unsubscribe(draw_mode);
        picker.unsubscribe(&mut channels);
        camera.unsubscribe(&mut channels);
        physics.teardown(&mut world);
        info!("Play state shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_and_quit_end_the_state() {
        let mut messages = VecDeque::from([StateMessage::None, StateMessage::Pop]);
        assert!(drain_messages(&mut messages));
        assert!(messages.is_empty());

        let mut messages = VecDeque::from([StateMessage::Quit]);
        assert!(drain_messages(&mut messages));
    }

    #[test]
    fn test_pushes_are_drained_without_ending() {
        let mut messages = VecDeque::from([StateMessage::PushMainMenu, StateMessage::PushPlay, StateMessage::None]);
        assert!(!drain_messages(&mut messages));
        assert!(messages.is_empty());
    }
}
