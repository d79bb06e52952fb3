//! Geometry binding components
//!
//! Link an entity to the shared mesh of its type and to its slot in the per-type
//! instance transform block.

use crate::ecs::Component;

/// Type tag naming the model group an entity belongs to (e.g. "book", "crt3")
///
/// All entities sharing a type share mesh data and differ only by transform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(pub String);

impl Component for EntityType {}

impl EntityType {
    /// Prefix shared by every animated monitor type
    pub const DISPLAY_PREFIX: &'static str = "crt";

    /// Create a type tag
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this type is one of the animated monitors
    pub fn is_display(&self) -> bool {
        self.0.starts_with(Self::DISPLAY_PREFIX)
    }
}

/// Where an entity's transform lives in the instance buffer
///
/// Assigned once at creation and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryInstance {
    /// First slot of the type's transform block
    pub base_instance: u32,
    /// Ordinal of this entity within its type
    pub instance_id: u32,
}

impl Component for GeometryInstance {}

impl GeometryInstance {
    /// Absolute slot in the instance transform buffer
    pub fn slot(&self) -> u32 {
        self.base_instance + self.instance_id
    }
}
