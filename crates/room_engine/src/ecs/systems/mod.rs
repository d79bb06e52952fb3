//! ECS Systems module
//!
//! Systems that run over the registry each frame. Physics, picking and the
//! camera live with their subsystems; this holds the scene-level animators.

pub mod display_animator;

pub use display_animator::{DisplayAnimator, DisplayTick};
