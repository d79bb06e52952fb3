//! # Rendering System
//!
//! Instanced, indirect-draw rendering of the room scene.
//!
//! ## Architecture
//!
//! - **Batches**: scene geometry grouped by material class, one indirect command
//!   per sub-mesh, with per-draw colors or bindless texture slots
//! - **Pipeline**: the fixed pass sequence (stencil room, batches, foreground
//!   quad, debug lines, bloom, composite) and the per-frame buffer sync
//! - **API**: the [`RenderBackend`] trait the pipeline drives, uniform layouts and
//!   renderer configuration
//! - **Vulkan Backend**: ash-based implementation of the backend trait

pub mod api;
pub mod background;
pub mod batch;
pub mod bloom;
pub mod pipeline;
pub mod textures;
pub mod vertex;
pub mod vulkan;

pub use api::{BackendResult, CameraUniform, PassCommand, RenderBackend, RendererConfig};
pub use background::{BackgroundQuad, BACKGROUND_TEXTURE};
pub use batch::{BatchRange, BatchSet, MaterialClass, RenderBatch, SubMeshMaterial};
pub use bloom::{gaussian_weights, BlurDirection};
pub use pipeline::{PassSet, RenderPipeline, SyncStats};
pub use textures::{TextureTable, FALLBACK_SLOT, MAX_TEXTURES};
pub use vertex::{InstanceTransform, LineVertex, QuadVertex, Vertex};

use thiserror::Error;

/// Rendering system error types
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    ///
    /// Missing drivers, an unsuitable device, or a window that could not hand
    /// out a surface.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
