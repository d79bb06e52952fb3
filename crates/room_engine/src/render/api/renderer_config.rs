//! Renderer configuration
//!
//! Backend-level knobs the application sets once at startup. Scene content and
//! camera parameters are not configured here.

use std::path::PathBuf;

/// Configuration for the Vulkan renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Folder holding the compiled `*.spv` pass shaders
    pub shader_dir: PathBuf,
    /// Present with FIFO when true, MAILBOX/IMMEDIATE otherwise
    pub vsync: bool,
    /// Whether to enable Vulkan validation layers
    pub enable_validation: Option<bool>,
    /// HDR target clear color [R, G, B, A]
    pub clear_color: [f32; 4],
}

impl RendererConfig {
    /// Create a configuration loading shaders from `shader_dir`
    pub fn new(app_name: impl Into<String>, shader_dir: impl Into<PathBuf>) -> Self {
        Self {
            application_name: app_name.into(),
            shader_dir: shader_dir.into(),
            vsync: true,
            enable_validation: None, // Auto-detect based on debug build
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Set presentation sync
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable Vulkan validation layers
    pub fn with_validation(mut self, enable: bool) -> Self {
        self.enable_validation = Some(enable);
        self
    }

    /// Set the HDR clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Path of a compiled shader
    pub fn shader_path(&self, name: &str) -> PathBuf {
        self.shader_dir.join(format!("{name}.spv"))
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("glRoom", "assets/shaders")
    }
}
