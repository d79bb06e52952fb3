//! # Room Engine
//!
//! Core of an interactive 3D room viewer: a level of furniture and props, some of
//! them rigid bodies the user can grab and fling with the mouse, drawn with
//! instanced indirect rendering and a bloom post-process.
//!
//! ## Features
//!
//! - **ECS Registry**: sparse-set component storage keyed by generational entities
//! - **Physics Picking**: rapier3d bodies, ray picking and a joint-driven drag
//! - **Vulkan Rendering**: batched multi-draw indirect, bindless textures, a
//!   stencil-masked overlay and HDR bloom
//! - **Orbit Camera**: yaw, pitch and zoom around the room center
//! - **Input Routing**: typed gesture channels between the window and the systems
//! - **Display Animator**: typewriter text across the monitor screens
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use room_engine::prelude::*;
//!
//! let settings = ViewerSettings::default();
//! let mut world = World::new();
//! let mut physics = PhysicsWorld::new(&settings.physics);
//! let mut loader = SceneLoader::new(&settings.asset_root);
//! let scene = loader.load(&settings.level_file, &mut world, &mut physics);
//! println!("{} instances", scene.instance_count());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod ecs;
pub mod events;
pub mod input;
pub mod assets;
pub mod physics;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{SceneGeometry, SceneLoader},
        config::{Config, ViewerSettings},
        ecs::{components::Transform, Component, DrawMode, Entity, SimContext, World},
        events::{AudioCue, EventChannel, InputChannels},
        foundation::{
            math::{Mat4, Mat4Ext, Vec3},
            time::{FrameTimer, IntervalTimer},
        },
        input::{InputEvent, InputRouter, KeyCode, MouseButton, StateMessage},
        physics::{PhysicsWorld, Picker},
        render::{RenderBackend, RenderPipeline, RendererConfig},
        scene::CameraController,
    };
}
