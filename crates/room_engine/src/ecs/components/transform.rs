//! Transform component for the ECS system
//!
//! Holds the world matrix the renderer uploads for an instance together with the
//! dirty flag that forms the only synchronization contract between simulation and
//! rendering:
//! - whoever moves an entity goes through [`Transform::set`], which raises the flag
//! - the rendering pipeline writes the matrix to the GPU and calls [`Transform::mark_clean`]

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::ecs::Component;

/// ECS Transform component
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    model: Mat4,
    dirty: bool,
}

impl Component for Transform {}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Mat4::identity())
    }
}

impl Transform {
    /// Create a clean transform
    ///
    /// Initial transforms are written into the instance buffer when it is created,
    /// so a fresh transform does not need a sync.
    pub fn new(model: Mat4) -> Self {
        Self { model, dirty: false }
    }

    /// Current world matrix
    pub fn model(&self) -> &Mat4 {
        &self.model
    }

    /// World-space translation
    pub fn position(&self) -> Vec3 {
        self.model.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Replace the world matrix and flag it for upload
    pub fn set(&mut self, model: Mat4) {
        self.model = model;
        self.dirty = true;
    }

    /// Whether the matrix changed since the last upload
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge that the GPU copy is current
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Transform factory for creating common transform configurations
pub struct TransformFactory;

impl TransformFactory {
    /// Placement used by level records: translate, then yaw about +Y (radians)
    pub fn placed(position: Vec3, yaw: f32) -> Transform {
        Transform::new(Mat4::from_translation_yaw(position, yaw))
    }

    /// Pure translation
    pub fn at(position: Vec3) -> Transform {
        Transform::new(Mat4::new_translation(&position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_transform_is_clean() {
        let transform = TransformFactory::at(Vec3::new(1.0, 2.0, 3.0));
        assert!(!transform.is_dirty());
        assert_relative_eq!(transform.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_set_raises_and_clean_lowers_flag() {
        let mut transform = Transform::default();
        transform.set(Mat4::new_translation(&Vec3::new(0.0, 4.0, 0.0)));
        assert!(transform.is_dirty());
        assert_relative_eq!(transform.position().y, 4.0);

        transform.mark_clean();
        assert!(!transform.is_dirty());
    }

    #[test]
    fn test_placed_applies_yaw_after_translation() {
        let transform = TransformFactory::placed(Vec3::new(5.0, 0.0, 0.0), std::f32::consts::PI);
        assert_relative_eq!(transform.position(), Vec3::new(5.0, 0.0, 0.0), epsilon = 1e-6);
        let forward = transform.model().transform_vector(&Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(forward, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }
}
