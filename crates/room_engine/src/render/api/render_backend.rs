//! Backend abstraction for the frame pipeline
//!
//! The pipeline decides what runs and in which order; a backend owns the GPU
//! objects and turns each [`PassCommand`] into recorded commands. Buffer updates
//! follow a map-write-unmap discipline: every `write_*` call has exclusive access
//! to the mapped memory for its duration only.

use crate::assets::SceneGeometry;
use crate::render::batch::{BatchRange, MaterialClass};
use crate::render::bloom::{BlurDirection, TAPS};
use crate::render::vertex::{InstanceTransform, LineVertex, QuadVertex};
use crate::render::RenderError;

use super::CameraUniform;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// One recorded step of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassCommand {
    /// Room geometry into the HDR target, writing stencil reference 1
    StencilRoom,
    /// One multi-draw-indirect call over a batch's command range
    Batch(BatchRange),
    /// Foreground quad where the stencil is still 0
    Background,
    /// Physics wireframes, `vertex_count` line endpoints
    DebugLines {
        /// Endpoints written by the last [`RenderBackend::write_debug_lines`]
        vertex_count: u32,
    },
    /// Bright-pass from the HDR target into the quarter-resolution buffer
    BloomExtract,
    /// One separable blur step between the ping-pong buffers
    Blur(BlurDirection),
    /// Full-screen resolve of HDR plus blurred bloom into the swapchain image
    Composite,
}

impl PassCommand {
    /// Whether the command draws into the HDR geometry target
    pub fn targets_hdr(&self) -> bool {
        matches!(
            self,
            Self::StencilRoom | Self::Batch(_) | Self::Background | Self::DebugLines { .. }
        )
    }
}

/// Rendering backend driven by [`crate::render::RenderPipeline`]
pub trait RenderBackend {
    /// Current swapchain extent (width, height)
    fn extent(&self) -> (u32, u32);

    /// Create every static GPU buffer and image for a loaded scene
    ///
    /// Called once; vertex, index, indirect, instance, material and texture data
    /// are copied in their initial state.
    fn upload_scene(&mut self, scene: &SceneGeometry) -> BackendResult<()>;

    /// Store the blur kernel, centre tap first
    fn set_blur_weights(&mut self, weights: &[f32; TAPS]) -> BackendResult<()>;

    /// Write the camera block
    fn write_camera(&mut self, camera: &CameraUniform) -> BackendResult<()>;

    /// Map the whole instance transform block and hand it to `write`
    fn write_instance_transforms(&mut self, write: &mut dyn FnMut(&mut [InstanceTransform])) -> BackendResult<()>;

    /// Replace a textured batch's per-draw texture slots
    fn write_texture_handles(&mut self, class: MaterialClass, slots: &[u32]) -> BackendResult<()>;

    /// Replace the foreground quad's vertices
    fn write_background(&mut self, vertices: &[QuadVertex; 4]) -> BackendResult<()>;

    /// Replace the debug line vertices
    fn write_debug_lines(&mut self, lines: &[LineVertex]) -> BackendResult<()>;

    /// Acquire an image and start recording
    ///
    /// Returns false when the frame must be skipped, e.g. while the swapchain is
    /// being recreated.
    fn begin_frame(&mut self) -> BackendResult<bool>;

    /// Record one pass
    fn record(&mut self, command: PassCommand) -> BackendResult<()>;

    /// Submit and present
    fn end_frame(&mut self) -> BackendResult<()>;

    /// Wait for the device to be idle
    fn wait_idle(&self) -> BackendResult<()>;
}
