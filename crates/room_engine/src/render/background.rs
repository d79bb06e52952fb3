//! Foreground overlay quad
//!
//! A full-screen quad drawn only where the room's stencil is clear. Its texture is
//! twice as tall as the visible window, so horizontal camera motion slides the
//! visible half through it.

use super::vertex::QuadVertex;

/// Initial texture coordinates, top-left clockwise
const INITIAL_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 0.5], [0.0, 0.5]];

/// Texture path relative to the asset root
pub const BACKGROUND_TEXTURE: &str = "models/textures/bg.png";

/// Screen quad with scrolling texture coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundQuad {
    uvs: [[f32; 2]; 4],
    texture_slot: u32,
    dirty: bool,
}

impl BackgroundQuad {
    /// Index list for the two triangles
    pub const INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

    /// Quad sampling `texture_slot` of the bindless table
    pub fn new(texture_slot: u32) -> Self {
        Self {
            uvs: INITIAL_UVS,
            texture_slot,
            dirty: false,
        }
    }

    /// Shift the texture window by `delta` in v
    ///
    /// The top edge wraps into [0, 0.5); the bottom edge stays half a texture below.
    pub fn scroll(&mut self, delta: f32) {
        let mut top = self.uvs[0][1] + delta;
        if top >= 0.5 {
            top -= 0.5;
        } else if top < 0.0 {
            top += 0.5;
        }

        self.uvs[0][1] = top;
        self.uvs[1][1] = top;
        self.uvs[2][1] = top + 0.5;
        self.uvs[3][1] = top + 0.5;
        self.dirty = true;
    }

    /// Current texture coordinates
    pub fn uvs(&self) -> &[[f32; 2]; 4] {
        &self.uvs
    }

    /// Bindless slot of the overlay texture
    pub fn texture_slot(&self) -> u32 {
        self.texture_slot
    }

    /// Vertices with NDC corners and current texture coordinates
    pub fn vertices(&self) -> [QuadVertex; 4] {
        const CORNERS: [[f32; 3]; 4] = [[-1.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, -1.0, 0.0]];
        let mut vertices = [QuadVertex::default(); 4];
        for (vertex, (corner, uv)) in vertices.iter_mut().zip(CORNERS.iter().zip(self.uvs.iter())) {
            *vertex = QuadVertex { position: *corner, tex_coord: *uv };
        }
        vertices
    }

    /// Whether the coordinates changed since the last upload
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge the upload
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scroll_moves_both_edges() {
        let mut quad = BackgroundQuad::new(1);
        quad.scroll(0.1);
        assert!(quad.is_dirty());
        assert_relative_eq!(quad.uvs()[0][1], 0.1);
        assert_relative_eq!(quad.uvs()[1][1], 0.1);
        assert_relative_eq!(quad.uvs()[2][1], 0.6);
        assert_relative_eq!(quad.uvs()[3][1], 0.6);
        // u never changes
        assert_relative_eq!(quad.uvs()[1][0], 1.0);
    }

    #[test]
    fn test_scroll_wraps_into_half_range() {
        let mut quad = BackgroundQuad::new(1);
        quad.scroll(0.45);
        quad.scroll(0.1);
        assert_relative_eq!(quad.uvs()[0][1], 0.05, epsilon = 1e-6);

        quad.scroll(-0.1);
        assert_relative_eq!(quad.uvs()[0][1], 0.45, epsilon = 1e-6);
        assert_relative_eq!(quad.uvs()[3][1], 0.95, epsilon = 1e-6);
    }

    #[test]
    fn test_vertices_carry_current_uvs() {
        let mut quad = BackgroundQuad::new(2);
        quad.scroll(0.25);
        let vertices = quad.vertices();
        assert_eq!(vertices[0].position, [-1.0, 1.0, 0.0]);
        assert_relative_eq!(vertices[2].tex_coord[1], 0.75);
    }
}
