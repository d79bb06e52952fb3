//! Physics wireframe collection
//!
//! Collects collider outlines, joint anchors and bounding boxes as colored line
//! segments for the debug pass. The rapier debug renderer hands out colors as
//! HSLA; they are converted to RGB here so the shader stays trivial.

use rapier3d::pipeline::{DebugRenderBackend, DebugRenderObject};
use rapier3d::prelude::{Point, Real};

use crate::render::LineVertex;

/// Color of collider bounding boxes
pub const AABB_COLOR: [f32; 3] = [1.0, 0.0, 0.0];

/// Line list gathered for one frame
#[derive(Debug, Default)]
pub struct DebugLines {
    vertices: Vec<LineVertex>,
}

impl DebugLines {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one segment
    pub fn push(&mut self, a: [f32; 3], b: [f32; 3], color: [f32; 3]) {
        self.vertices.push(LineVertex { position: a, color });
        self.vertices.push(LineVertex { position: b, color });
    }

    /// Append the twelve edges of an axis-aligned box
    pub fn push_box(&mut self, mins: [f32; 3], maxs: [f32; 3], color: [f32; 3]) {
        let corner = |i: usize| {
            [
                if i & 1 == 0 { mins[0] } else { maxs[0] },
                if i & 2 == 0 { mins[1] } else { maxs[1] },
                if i & 4 == 0 { mins[2] } else { maxs[2] },
            ]
        };
        for i in 0..8 {
            for bit in [1, 2, 4] {
                if i & bit == 0 {
                    self.push(corner(i), corner(i | bit), color);
                }
            }
        }
    }

    /// Collected vertices, two per segment
    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }

    /// Take the vertices, leaving the list empty
    pub fn take(&mut self) -> Vec<LineVertex> {
        std::mem::take(&mut self.vertices)
    }
}

impl DebugRenderBackend for DebugLines {
    fn draw_line(&mut self, _object: DebugRenderObject<'_>, a: Point<Real>, b: Point<Real>, color: [f32; 4]) {
        self.push(a.into(), b.into(), hsla_to_rgb(color));
    }
}

/// Convert `[hue degrees, saturation, lightness, alpha]` to RGB
pub fn hsla_to_rgb([hue, saturation, lightness, _alpha]: [f32; 4]) -> [f32; 3] {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let m = lightness - chroma / 2.0;

    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    [r + m, g + m, b + m]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hsla_primaries() {
        let red = hsla_to_rgb([0.0, 1.0, 0.5, 1.0]);
        assert_relative_eq!(red[0], 1.0);
        assert_relative_eq!(red[1], 0.0);

        let blue = hsla_to_rgb([240.0, 1.0, 0.5, 1.0]);
        assert_relative_eq!(blue[2], 1.0);
        assert_relative_eq!(blue[0], 0.0);

        let grey = hsla_to_rgb([123.0, 0.0, 0.25, 1.0]);
        assert_relative_eq!(grey[0], 0.25);
        assert_relative_eq!(grey[1], 0.25);
    }

    #[test]
    fn test_box_has_twelve_edges() {
        let mut lines = DebugLines::new();
        lines.push_box([0.0; 3], [1.0; 3], AABB_COLOR);
        assert_eq!(lines.vertices().len(), 24);
        assert!(lines.take().len() == 24 && lines.vertices().is_empty());
    }
}
