//! Math utilities and types
//!
//! Provides the fundamental math types shared by the simulation and the renderer.
//! Matrices follow the OpenGL clip convention (NDC depth in [-1, 1], Y up) so that
//! picking rays unproject the same way on every backend; the Vulkan backend applies
//! [`Mat4Ext::vulkan_clip_correction`] when it uploads the projection.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Wrap an angle in degrees back under one full turn
    ///
    /// Only the upper bound wraps; negative angles are left alone so a camera
    /// dragged the other way keeps counting down.
    pub fn wrap_degrees(angle: f32) -> f32 {
        if angle > 360.0 { angle - 360.0 } else { angle }
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a right-handed perspective projection (OpenGL clip space)
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Translation followed by a yaw rotation about +Y (radians)
    fn from_translation_yaw(position: Vec3, yaw: f32) -> Mat4;

    /// Remap OpenGL clip space to Vulkan clip space
    ///
    /// Flips Y (Vulkan framebuffer Y points down) and maps depth from [-1, 1] to [0, 1].
    fn vulkan_clip_correction() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn from_translation_yaw(position: Vec3, yaw: f32) -> Mat4 {
        Mat4::new_translation(&position) * Mat4::rotation_y(yaw)
    }

    fn vulkan_clip_correction() -> Mat4 {
        Mat4::new(
            1.0,  0.0, 0.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0,  0.0, 0.5, 0.5,
            0.0,  0.0, 0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 10.0);
        let view = Mat4::look_at(eye, Vec3::zeros(), Vec3::y());
        let p = view.transform_point(&Point3::from(eye));
        assert_relative_eq!(p.coords, Vec3::zeros(), epsilon = 1e-5);

        // Target lies straight down -Z in view space
        let t = view.transform_point(&Point3::origin());
        assert_relative_eq!(t.z, -10.0, epsilon = 1e-5);
    }

    #[test]
    fn test_clip_correction_maps_depth_range() {
        let fix = Mat4::vulkan_clip_correction();
        let near = fix * Vec4::new(0.0, 1.0, -1.0, 1.0);
        let far = fix * Vec4::new(0.0, 1.0, 1.0, 1.0);
        assert_relative_eq!(near.z, 0.0);
        assert_relative_eq!(far.z, 1.0);
        assert_relative_eq!(near.y, -1.0);
    }

    #[test]
    fn test_translation_yaw() {
        let m = Mat4::from_translation_yaw(Vec3::new(1.0, 2.0, 3.0), std::f32::consts::FRAC_PI_2);
        let p = m.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.coords, Vec3::new(1.0, 2.0, 2.0), epsilon = 1e-5);
    }

    #[test]
    fn test_wrap_degrees() {
        assert_relative_eq!(utils::wrap_degrees(370.0), 10.0);
        assert_relative_eq!(utils::wrap_degrees(360.0), 360.0);
        assert_relative_eq!(utils::wrap_degrees(-5.0), -5.0);
    }
}
