//! Vulkan rendering backend
//!
//! Thin RAII wrappers over ash plus [`VulkanRenderer`], which implements
//! [`RenderBackend`](crate::render::RenderBackend) on top of them. Every wrapper
//! owns a clone of the device handle and destroys its object on drop; the
//! renderer declares its fields so that the context drops last.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod framebuffer;
pub mod render_pass;
pub mod renderer;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod targets;
pub mod texture;
pub mod vertex_layout;
pub mod window;

use ash::vk;
use thiserror::Error;

use crate::render::RenderError;

pub use buffer::Buffer;
pub use commands::{CommandPool, CommandRecorder};
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanInstance};
pub use descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
pub use framebuffer::{AttachmentImage, Framebuffer};
pub use render_pass::RenderPass;
pub use renderer::{DrawMaterial, VulkanRenderer};
pub use shader::{GraphicsPipeline, PipelineBuilder, ShaderModule, StencilMode};
pub use swapchain::Swapchain;
pub use sync::FrameSync;
pub use targets::RenderTargets;
pub use texture::{Sampler, Texture};
pub use window::{Window, WindowError};

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// SPIR-V file could not be read
    #[error("Shader {path}: {reason}")]
    Shader {
        /// Offending file
        path: String,
        /// What went wrong
        reason: String,
    },
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

impl From<VulkanError> for RenderError {
    fn from(error: VulkanError) -> Self {
        RenderError::BackendError(error.to_string())
    }
}

impl From<WindowError> for RenderError {
    fn from(error: WindowError) -> Self {
        RenderError::InitializationFailed(error.to_string())
    }
}
