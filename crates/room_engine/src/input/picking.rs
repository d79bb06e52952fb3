//! Screen-space picking rays
//!
//! Converts a cursor position into a world-space ray by unprojecting through the
//! inverse projection and inverse view held in the [`SimContext`].

use crate::ecs::SimContext;
use crate::foundation::math::{Mat4, Vec3, Vec4};

/// World-space ray starting at the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickRay {
    /// Ray start, the camera position
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
    /// Maximum distance the ray reaches
    pub length: f32,
}

impl PickRay {
    /// Point at `distance` along the ray
    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Convert window pixels to normalized device coordinates
///
/// X runs -1 (left) to +1 (right); Y runs +1 (top) to -1 (bottom).
pub fn screen_to_ndc(x: f32, y: f32, viewport: (u32, u32)) -> (f32, f32) {
    let (width, height) = viewport;
    let width = width.max(1) as f32;
    let height = height.max(1) as f32;
    (2.0 * x / width - 1.0, 1.0 - 2.0 * y / height)
}

/// Build the world-space ray under a cursor position
///
/// Returns `None` when the projection or view cannot be inverted.
pub fn pick_ray(context: &SimContext, x: f32, y: f32, length: f32) -> Option<PickRay> {
    let (ndc_x, ndc_y) = screen_to_ndc(x, y, context.viewport);

    let inverse_projection: Mat4 = context.projection.try_inverse()?;
    let inverse_view: Mat4 = context.view.try_inverse()?;

    let eye = inverse_projection * Vec4::new(ndc_x, ndc_y, -1.0, 1.0);
    let eye = Vec4::new(eye.x, eye.y, -1.0, 0.0);
    let world = inverse_view * eye;

    let direction = Vec3::new(world.x, world.y, world.z).try_normalize(f32::EPSILON)?;

    Some(PickRay {
        origin: context.camera_position,
        direction,
        length,
    })
}
