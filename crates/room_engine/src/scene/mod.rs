//! Scene viewpoint
//!
//! The orbit camera that turns drag and wheel gestures into the view matrix
//! shared through [`crate::ecs::SimContext`].

mod camera;

pub use camera::{CameraController, CameraInput, CameraMotion, OrbitCamera};
