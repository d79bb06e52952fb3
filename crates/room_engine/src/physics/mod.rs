//! Rigid-body physics
//!
//! A rapier3d world bound to the registry: bodies carry their entity in user
//! data, stepping writes transforms back, and a spherical joint to a kinematic
//! anchor implements mouse dragging.

pub mod debug;
pub mod picker;
pub mod shapes;
pub mod world;

pub use debug::DebugLines;
pub use picker::Picker;
pub use shapes::ShapeCache;
pub use world::{BodyDesc, PhysicsWorld, PickState};

use thiserror::Error;

use crate::assets::ObjError;

/// Physics setup errors
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Collision model could not be loaded
    #[error("collision model {path}: {source}")]
    Model {
        /// Model path
        path: String,
        /// Loader error
        #[source]
        source: ObjError,
    },
    /// Points do not span a volume
    #[error("convex hull of {0} is degenerate")]
    DegenerateHull(String),
}

/// Result alias for physics setup
pub type Result<T> = std::result::Result<T, PhysicsError>;
