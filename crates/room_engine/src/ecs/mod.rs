//! Entity-Component-System implementation
//!
//! The scene registry: sparse-set component storage, the closed set of scene
//! components, the shared simulation context and the systems that run each frame.

pub mod world;
pub mod entity;
pub mod component;
pub mod storage;
pub mod components;
pub mod context;
pub mod systems;

pub use world::World;
pub use entity::Entity;
pub use component::Component;
pub use storage::SparseSet;
pub use context::{DrawMode, SimContext};
