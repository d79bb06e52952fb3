//! OBJ file loader for 3D models
//!
//! Splits a model into sub-meshes at every `o`/`g` statement. Each sub-mesh gets
//! its own compact vertex array: a face corner is identified by its
//! (position, texcoord, normal) index tuple and identical tuples share one vertex.
//! Indices are local to the sub-mesh so the batch builder can rebase them with a
//! vertex offset.
//!
//! Raw positions and position-index triangles are kept alongside for collision
//! shapes, which only need geometry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, warn};
use thiserror::Error;

use super::materials::{MtlData, MtlParser};
use crate::render::Vertex;

/// OBJ loading errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending file
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Malformed statement
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// Face refers to an element that does not exist
    #[error("line {line}: index {index} out of range")]
    IndexOutOfRange {
        /// 1-based line number
        line: usize,
        /// Index as written in the file
        index: i64,
    },
    /// No faces at all
    #[error("model has no faces")]
    Empty,
}

/// Result alias for OBJ loading
pub type Result<T> = std::result::Result<T, ObjError>;

/// One object or group of a model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMesh {
    /// Object or group name
    pub name: String,
    /// Material active at the sub-mesh's first face
    pub material: Option<String>,
    /// Deduplicated vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl SubMesh {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn has_faces(&self) -> bool {
        !self.indices.is_empty()
    }
}

/// Parsed model
#[derive(Debug, Clone, Default)]
pub struct ObjModel {
    /// Sub-meshes in file order, empty ones dropped
    pub sub_meshes: Vec<SubMesh>,
    /// Every `v` position in file order
    pub positions: Vec<[f32; 3]>,
    /// Every triangle as position indices
    pub triangles: Vec<[u32; 3]>,
    /// Materials from all referenced libraries
    pub materials: HashMap<String, MtlData>,
}

impl ObjModel {
    /// Material of a sub-mesh, if it names one that was loaded
    pub fn material_of(&self, sub_mesh: &SubMesh) -> Option<&MtlData> {
        sub_mesh.material.as_ref().and_then(|name| self.materials.get(name))
    }
}

type CornerKey = (usize, Option<usize>, Option<usize>);

/// Wavefront OBJ loader
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file; `mtllib` paths resolve next to the file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ObjModel> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ObjError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents, path.parent())
    }

    /// Parse OBJ text; `base_dir` resolves material libraries
    pub fn parse(contents: &str, base_dir: Option<&Path>) -> Result<ObjModel> {
        let mut model = ObjModel::default();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();

        let mut current = SubMesh::named("default");
        let mut corners: HashMap<CornerKey, u32> = HashMap::new();
        let mut active_material: Option<String> = None;
        let mut warned_missing_normal = false;

        for (index, line) in contents.lines().enumerate() {
            let line_num = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else {
                continue;
            };

            match keyword {
                "v" => model.positions.push(Self::parse_floats::<3>(&mut parts, line_num, "vertex")?),
                "vn" => normals.push(Self::parse_floats::<3>(&mut parts, line_num, "normal")?),
                "vt" => tex_coords.push(Self::parse_floats::<2>(&mut parts, line_num, "texture coordinate")?),
                "o" | "g" => {
                    let name = parts.collect::<Vec<_>>().join(" ");
                    if current.has_faces() {
                        model.sub_meshes.push(std::mem::replace(&mut current, SubMesh::named(&name)));
                        corners.clear();
                    } else {
                        current.name = name;
                    }
                }
                "usemtl" => active_material = parts.next().map(str::to_string),
                "mtllib" => {
                    for library in parts {
                        Self::load_library(base_dir, library, &mut model.materials);
                    }
                }
                "f" => {
                    let mut face = Vec::with_capacity(4);
                    let mut face_positions = Vec::with_capacity(4);

                    for corner in parts {
                        let key = Self::parse_corner(corner, line_num, &model.positions, &tex_coords, &normals)?;
                        if key.2.is_none() && !warned_missing_normal {
                            warn!("OBJ line {}: face corner without normal, using +Y", line_num);
                            warned_missing_normal = true;
                        }
                        face_positions.push(key.0 as u32);

                        let vertex_index = match corners.get(&key) {
                            Some(&existing) => existing,
                            None => {
                                let new_index = current.vertices.len() as u32;
                                current.vertices.push(Vertex {
                                    position: model.positions[key.0],
                                    normal: key.2.map_or([0.0, 1.0, 0.0], |n| normals[n]),
                                    tex_coord: key.1.map_or([0.0, 0.0], |t| tex_coords[t]),
                                });
                                corners.insert(key, new_index);
                                new_index
                            }
                        };
                        face.push(vertex_index);
                    }

                    if face.len() < 3 {
                        return Err(ObjError::Parse {
                            line: line_num,
                            message: format!("face with {} corners", face.len()),
                        });
                    }

                    if !current.has_faces() {
                        current.material = active_material.clone();
                    }

                    // Fan triangulation
                    for i in 1..face.len() - 1 {
                        current.indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                        model.triangles.push([face_positions[0], face_positions[i], face_positions[i + 1]]);
                    }
                }
                // Smoothing groups, lines and free-form geometry are not drawn
                _ => {}
            }
        }

        if current.has_faces() {
            model.sub_meshes.push(current);
        }
        if model.sub_meshes.is_empty() {
            return Err(ObjError::Empty);
        }

        Ok(model)
    }

    fn load_library(base_dir: Option<&Path>, library: &str, materials: &mut HashMap<String, MtlData>) {
        let path: PathBuf = base_dir.map_or_else(|| PathBuf::from(library), |dir| dir.join(library));
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Material library {:?} unavailable: {}", path, e);
                return;
            }
        };
        match MtlParser::parse(&contents) {
            Ok(parsed) => materials.extend(parsed),
            Err(e) => error!("Material library {:?}: {}", path, e),
        }
    }

    fn parse_floats<'a, const N: usize>(
        parts: &mut impl Iterator<Item = &'a str>,
        line: usize,
        what: &str,
    ) -> Result<[f32; N]> {
        let mut values = [0.0; N];
        for value in &mut values {
            let token = parts.next().ok_or_else(|| ObjError::Parse {
                line,
                message: format!("{} needs {} components", what, N),
            })?;
            *value = token.parse().map_err(|_| ObjError::Parse {
                line,
                message: format!("invalid {} component '{}'", what, token),
            })?;
        }
        Ok(values)
    }

    /// Parse `v`, `v/t`, `v//n` or `v/t/n`, resolving negative (relative) indices
    fn parse_corner(
        corner: &str,
        line: usize,
        positions: &[[f32; 3]],
        tex_coords: &[[f32; 2]],
        normals: &[[f32; 3]],
    ) -> Result<CornerKey> {
        let mut fields = corner.split('/');
        let position = match fields.next() {
            Some(field) if !field.is_empty() => Self::resolve(field, positions.len(), line)?,
            _ => {
                return Err(ObjError::Parse {
                    line,
                    message: format!("face corner '{}' has no position", corner),
                })
            }
        };
        let tex_coord = match fields.next() {
            Some(field) if !field.is_empty() => Some(Self::resolve(field, tex_coords.len(), line)?),
            _ => None,
        };
        let normal = match fields.next() {
            Some(field) if !field.is_empty() => Some(Self::resolve(field, normals.len(), line)?),
            _ => None,
        };
        Ok((position, tex_coord, normal))
    }

    fn resolve(field: &str, len: usize, line: usize) -> Result<usize> {
        let raw: i64 = field.parse().map_err(|_| ObjError::Parse {
            line,
            message: format!("invalid index '{}'", field),
        })?;
        let resolved = if raw > 0 { raw - 1 } else { len as i64 + raw };
        if raw == 0 || resolved < 0 || resolved >= len as i64 {
            return Err(ObjError::IndexOutOfRange { line, index: raw });
        }
        Ok(resolved as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GROUPS: &str = "
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
o Body
usemtl Red
f 1/1/1 2/2/1 3/3/1 4/4/1
usemtl Blue
f 1/1/1 3/3/1 4/4/1
g Screen
usemtl Glow
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn test_groups_split_sub_meshes_with_first_face_material() {
        let model = ObjLoader::parse(TWO_GROUPS, None).unwrap();
        assert_eq!(model.sub_meshes.len(), 2);

        let body = &model.sub_meshes[0];
        assert_eq!(body.name, "Body");
        assert_eq!(body.material.as_deref(), Some("Red"));
        // Quad fan gives two triangles, plus one more triangle
        assert_eq!(body.indices.len(), 9);

        let screen = &model.sub_meshes[1];
        assert_eq!(screen.name, "Screen");
        assert_eq!(screen.material.as_deref(), Some("Glow"));
        assert_eq!(screen.indices, vec![0, 1, 2]);
        assert_eq!(model.triangles.len(), 4);
    }

    #[test]
    fn test_identical_corners_share_a_vertex() {
        let model = ObjLoader::parse(TWO_GROUPS, None).unwrap();
        let body = &model.sub_meshes[0];
        // Four distinct (v, t, n) tuples across three triangles
        assert_eq!(body.vertices.len(), 4);
        assert_eq!(body.vertices[2].tex_coord, [1.0, 1.0]);
        assert_eq!(body.vertices[2].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_distinct_normals_split_vertices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 0 -1\nf 1//1 2//1 3//1\nf 1//2 3//2 2//2\n";
        let model = ObjLoader::parse(obj, None).unwrap();
        assert_eq!(model.sub_meshes[0].vertices.len(), 6);
    }

    #[test]
    fn test_missing_normals_and_negative_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let model = ObjLoader::parse(obj, None).unwrap();
        let mesh = &model.sub_meshes[0];
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(model.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let obj = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        assert!(matches!(
            ObjLoader::parse(obj, None),
            Err(ObjError::IndexOutOfRange { line: 3, index: 3 })
        ));
    }

    #[test]
    fn test_no_faces_is_empty() {
        assert!(matches!(ObjLoader::parse("v 0 0 0\n", None), Err(ObjError::Empty)));
    }

    #[test]
    fn test_mtllib_resolves_next_to_model() {
        let dir = std::env::temp_dir().join("room_engine_obj_mtllib");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("thing.mtl"), "newmtl Red\nKd 1 0 0\n").unwrap();
        fs::write(dir.join("thing.obj"), "mtllib thing.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl Red\nf 1 2 3\n").unwrap();

        let model = ObjLoader::load(dir.join("thing.obj")).unwrap();
        let material = model.material_of(&model.sub_meshes[0]).unwrap();
        assert_eq!(material.flat_color(), [1.0, 0.0, 0.0, 1.0]);
    }
}
