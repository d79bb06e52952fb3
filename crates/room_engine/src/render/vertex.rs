//! Vertex formats shared by the loader and the backends
//!
//! Pure data: the Vulkan input layouts for these types live in the backend's
//! `vertex_layout` module so this file stays backend-agnostic.

use bytemuck::{Pod, Zeroable};

/// Interleaved mesh vertex: position, normal, texture coordinate
///
/// Eight floats per vertex; `baseVertex` offsets in indirect commands count in
/// units of this struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Floats per vertex
    pub const FLOATS: usize = 8;
}

/// Screen-space vertex for the foreground overlay quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct QuadVertex {
    /// NDC position
    pub position: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

/// Colored endpoint of a debug line
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LineVertex {
    /// World-space position
    pub position: [f32; 3],
    /// Linear RGB color
    pub color: [f32; 3],
}

/// Column-major model matrix as stored in the instance buffer
pub type InstanceTransform = [[f32; 4]; 4];
