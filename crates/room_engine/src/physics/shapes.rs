//! Collision shape construction
//!
//! Primitive shapes are built directly from their catalogue dimensions. Mesh
//! shapes read an OBJ from the asset root: convex hulls are cached per file so a
//! level with many chairs computes the hull once, triangle meshes are built per
//! body and own their vertex and index arrays.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use rapier3d::prelude::{Point, Real, SharedShape};

use super::{PhysicsError, Result};
use crate::assets::catalogue::ColliderSpec;
use crate::assets::{ObjLoader, ObjModel};

/// Builds shapes and remembers convex hulls by file
#[derive(Default)]
pub struct ShapeCache {
    hulls: HashMap<PathBuf, SharedShape>,
}

impl ShapeCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape for a catalogue collider, mesh paths relative to `asset_root`
    pub fn resolve(&mut self, spec: &ColliderSpec, asset_root: &Path) -> Result<SharedShape> {
        match *spec {
            ColliderSpec::Cuboid([hx, hy, hz]) => Ok(SharedShape::cuboid(hx, hy, hz)),
            ColliderSpec::Ball(radius) => Ok(SharedShape::ball(radius)),
            ColliderSpec::Cylinder { half_height, radius } => Ok(SharedShape::cylinder(half_height, radius)),
            ColliderSpec::ConvexHull(model) => self.convex_hull(&asset_root.join(model)),
            ColliderSpec::TriangleMesh(model) => triangle_mesh(&asset_root.join(model)),
        }
    }

    /// Convex hull of every vertex in an OBJ file, built once per path
    pub fn convex_hull(&mut self, path: &Path) -> Result<SharedShape> {
        if let Some(shape) = self.hulls.get(path) {
            return Ok(shape.clone());
        }

        let model = load_model(path)?;
        let points: Vec<Point<Real>> = model.positions.iter().map(|&p| Point::from(p)).collect();
        let shape = SharedShape::convex_hull(&points)
            .ok_or_else(|| PhysicsError::DegenerateHull(path.display().to_string()))?;

        debug!("Built convex hull for {:?} from {} points", path, points.len());
        self.hulls.insert(path.to_path_buf(), shape.clone());
        Ok(shape)
    }

    /// Number of distinct hulls built so far
    pub fn hull_count(&self) -> usize {
        self.hulls.len()
    }
}

/// Static triangle mesh of an OBJ file
pub fn triangle_mesh(path: &Path) -> Result<SharedShape> {
    let model = load_model(path)?;
    let vertices: Vec<Point<Real>> = model.positions.iter().map(|&p| Point::from(p)).collect();
    Ok(SharedShape::trimesh(vertices, model.triangles))
}

fn load_model(path: &Path) -> Result<ObjModel> {
    ObjLoader::load(path).map_err(|source| PhysicsError::Model {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TETRAHEDRON: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 2 3\nf 1 2 4\nf 1 3 4\nf 2 3 4\n";

    fn fixture_root() -> PathBuf {
        let root = std::env::temp_dir().join("room_engine_shape_tests");
        fs::create_dir_all(root.join("models")).unwrap();
        fs::write(root.join("models/tetra.obj"), TETRAHEDRON).unwrap();
        root
    }

    #[test]
    fn test_primitives_need_no_files() {
        let mut cache = ShapeCache::new();
        let root = Path::new("/nowhere");
        let shape = cache.resolve(&ColliderSpec::Cuboid([1.0, 2.0, 3.0]), root).unwrap();
        let cuboid = shape.as_cuboid().unwrap();
        assert_eq!(cuboid.half_extents.y, 2.0);
        assert!(cache.resolve(&ColliderSpec::Ball(0.5), root).unwrap().as_ball().is_some());
        assert!(cache
            .resolve(&ColliderSpec::Cylinder { half_height: 0.85, radius: 0.505 }, root)
            .unwrap()
            .as_cylinder()
            .is_some());
    }

    #[test]
    fn test_hulls_are_cached_per_file() {
        let root = fixture_root();
        let mut cache = ShapeCache::new();
        let spec = ColliderSpec::ConvexHull("models/tetra.obj");

        cache.resolve(&spec, &root).unwrap();
        cache.resolve(&spec, &root).unwrap();
        assert_eq!(cache.hull_count(), 1);
    }

    #[test]
    fn test_triangle_mesh_keeps_all_faces() {
        let root = fixture_root();
        let shape = triangle_mesh(&root.join("models/tetra.obj")).unwrap();
        assert_eq!(shape.as_trimesh().unwrap().indices().len(), 4);
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let mut cache = ShapeCache::new();
        let result = cache.resolve(&ColliderSpec::ConvexHull("models/none.obj"), Path::new("/nowhere"));
        assert!(matches!(result, Err(PhysicsError::Model { .. })));
    }
}
