//! Physics body component
//!
//! Handles into the rigid-body world owned by
//! [`PhysicsWorld`](crate::physics::PhysicsWorld). The world owns the body, its
//! collider and any triangle-mesh buffers behind the collider's shape; removing the
//! body through the world drops all of them together.

use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

use crate::ecs::Component;

/// Collision shape family chosen for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Oriented box
    Box,
    /// Sphere
    Sphere,
    /// Y-aligned cylinder
    Cylinder,
    /// Convex hull of a mesh's vertices
    ConvexHull,
    /// Static BVH-backed triangle mesh
    TriangleMesh,
}

/// Rigid body attached to an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody {
    /// Body handle in the rigid-body set
    pub body: RigidBodyHandle,
    /// Collider attached to the body
    pub collider: ColliderHandle,
    /// Shape family of the collider
    pub shape: ShapeKind,
}

impl Component for PhysicsBody {}
