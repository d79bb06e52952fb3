//! Shared simulation context
//!
//! The frame-wide state several systems read: projection, camera view, draw mode
//! and viewport size. It is passed by reference to whoever needs it instead of
//! living on a registry entity.

use crate::config::ProjectionSettings;
use crate::foundation::math::{utils::deg_to_rad, Mat4, Mat4Ext, Vec3};

/// Which passes the renderer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Scene passes only
    #[default]
    Normal,
    /// Scene passes plus physics wireframes
    NormalDebug,
    /// Physics wireframes only
    Debug,
}

impl DrawMode {
    /// Whether the room, batches and background overlay are drawn
    pub fn draws_scene(self) -> bool {
        matches!(self, Self::Normal | Self::NormalDebug)
    }

    /// Whether physics debug lines are drawn
    pub fn draws_debug(self) -> bool {
        matches!(self, Self::NormalDebug | Self::Debug)
    }
}

/// Projection, view and presentation state shared across systems
#[derive(Debug, Clone)]
pub struct SimContext {
    /// Perspective projection in OpenGL clip convention
    pub projection: Mat4,
    /// World to view transform
    pub view: Mat4,
    /// Eye position in world space
    pub camera_position: Vec3,
    /// Active draw mode
    pub draw_mode: DrawMode,
    /// Framebuffer size in pixels
    pub viewport: (u32, u32),
}

impl SimContext {
    /// Build a context for a viewport with an identity view
    pub fn new(settings: &ProjectionSettings, viewport: (u32, u32)) -> Self {
        let mut context = Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
            camera_position: Vec3::zeros(),
            draw_mode: DrawMode::Normal,
            viewport,
        };
        context.set_projection(settings);
        context
    }

    /// Recompute the projection for the current viewport
    pub fn set_projection(&mut self, settings: &ProjectionSettings) {
        self.projection = Mat4::perspective(
            deg_to_rad(settings.fov_degrees),
            self.aspect_ratio(),
            settings.near,
            settings.far,
        );
    }

    /// Width over height, 1 for a degenerate viewport
    pub fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.viewport;
        if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_draw_mode_passes() {
        assert!(DrawMode::Normal.draws_scene() && !DrawMode::Normal.draws_debug());
        assert!(DrawMode::NormalDebug.draws_scene() && DrawMode::NormalDebug.draws_debug());
        assert!(!DrawMode::Debug.draws_scene() && DrawMode::Debug.draws_debug());
    }

    #[test]
    fn test_square_viewport_projection() {
        let context = SimContext::new(&ProjectionSettings::default(), (800, 800));
        assert_relative_eq!(context.aspect_ratio(), 1.0);
        // Symmetric frustum: x and y scale match for a square viewport
        assert_relative_eq!(context.projection[(0, 0)], context.projection[(1, 1)]);
    }
}
