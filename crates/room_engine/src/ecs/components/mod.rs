//! ECS Components module
//!
//! Closed data structs attached to scene entities. Systems own the behavior:
//! the loader creates these, physics writes [`Transform`], the renderer reads
//! [`Transform`] and [`GeometryInstance`] and clears dirty flags.

pub mod transform;
pub mod geometry;
pub mod physics_body;
pub mod markers;

pub use transform::{Transform, TransformFactory};
pub use geometry::{EntityType, GeometryInstance};
pub use physics_body::{PhysicsBody, ShapeKind};
pub use markers::{PickedTag, CrtDisplay};
