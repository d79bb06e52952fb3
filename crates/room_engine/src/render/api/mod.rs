//! Public rendering API
//!
//! The backend trait the frame pipeline drives, the per-frame uniform layouts
//! and the renderer configuration.

pub mod frame_data;
pub mod render_backend;
pub mod renderer_config;

#[cfg(test)]
pub mod recording;

pub use frame_data::CameraUniform;
pub use render_backend::{BackendResult, PassCommand, RenderBackend};
pub use renderer_config::RendererConfig;
