//! Configuration system
//!
//! Settings are plain serde structs loaded from `.toml` or `.ron` files. A missing
//! settings file is not an error for the viewer: [`ViewerSettings::load_or_default`]
//! logs a warning and falls back to the built-in defaults.

pub use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec3;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Orbit camera tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Degrees per pixel-second of drag
    pub sensitivity: f32,
    /// Starting orbit radius
    pub initial_radius: f32,
    /// Starting pitch in degrees
    pub initial_pitch: f32,
    /// Starting yaw in degrees
    pub initial_yaw: f32,
    /// Closest allowed orbit radius
    pub min_radius: f32,
    /// Farthest allowed orbit radius
    pub max_radius: f32,
    /// Radius units per scroll-second
    pub zoom_speed: f32,
    /// Point the camera orbits and looks at
    pub target: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            sensitivity: 20.0,
            initial_radius: 45.0,
            initial_pitch: 36.0,
            initial_yaw: 45.0,
            min_radius: 10.0,
            max_radius: 150.0,
            zoom_speed: 55.0,
            target: [0.0, 5.0, 0.0],
        }
    }
}

impl CameraSettings {
    /// Orbit target as a vector
    pub fn target(&self) -> Vec3 {
        Vec3::from(self.target)
    }
}

/// Rigid-body world tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// World gravity
    pub gravity: [f32; 3],
    /// Length of the picking ray
    pub pick_ray_length: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: [0.0, -10.0, 0.0],
            pick_ray_length: 500.0,
        }
    }
}

/// Perspective projection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self { fov_degrees: 50.0, near: 0.1, far: 500.0 }
    }
}

/// Top-level viewer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Root folder holding `models/`, `audio/` and `shaders/`
    pub asset_root: String,
    /// Level description, relative to `asset_root`
    pub level_file: String,
    /// Window is `800 * window_scale` pixels square
    pub window_scale: u32,
    /// Window title
    pub title: String,
    /// Wait for vertical sync when presenting
    pub vsync: bool,
    /// Camera tuning
    pub camera: CameraSettings,
    /// Physics tuning
    pub physics: PhysicsSettings,
    /// Projection parameters
    pub projection: ProjectionSettings,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            asset_root: "./assets/".to_string(),
            level_file: "level.txt".to_string(),
            window_scale: 1,
            title: "glRoom".to_string(),
            vsync: true,
            camera: CameraSettings::default(),
            physics: PhysicsSettings::default(),
            projection: ProjectionSettings::default(),
        }
    }
}

impl Config for ViewerSettings {}

impl ViewerSettings {
    /// Base edge length of the window before scaling
    pub const BASE_WINDOW_SIZE: u32 = 800;

    /// Load settings, falling back to defaults when the file is missing or invalid
    pub fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path) {
            Ok(settings) => {
                log::info!("Loaded viewer settings from {}", path);
                settings
            }
            Err(e) => {
                log::warn!("Using default viewer settings ({}): {}", path, e);
                Self::default()
            }
        }
    }

    /// Window size in pixels
    pub fn window_size(&self) -> (u32, u32) {
        let edge = Self::BASE_WINDOW_SIZE * self.window_scale.max(1);
        (edge, edge)
    }

    /// Resolve a path relative to the asset root
    pub fn asset_path(&self, relative: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.asset_root).join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: ViewerSettings = toml::from_str(
            r#"
            window_scale = 2

            [camera]
            sensitivity = 10.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.window_size(), (1600, 1600));
        assert_eq!(settings.camera.sensitivity, 10.0);
        assert_eq!(settings.camera.initial_radius, 45.0);
        assert_eq!(settings.physics.pick_ray_length, 500.0);
        assert_eq!(settings.asset_root, "./assets/");
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join("room_engine_settings_test.ron");
        let path = path.to_string_lossy().to_string();

        let mut settings = ViewerSettings::default();
        settings.level_file = "other.txt".to_string();
        settings.save_to_file(&path).unwrap();

        let loaded = ViewerSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = ViewerSettings::load_or_default("/definitely/not/here.toml");
        assert_eq!(settings, ViewerSettings::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let result = ViewerSettings::load_from_file("Cargo.lock");
        assert!(result.is_err());
    }
}
