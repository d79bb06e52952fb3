//! Asset loading
//!
//! Level files, the keyword catalogue, OBJ/MTL models, textures and the scene
//! loader that ties them into registry entities and render batches.

pub mod catalogue;
pub mod level;
pub mod materials;
pub mod obj_loader;
pub mod scene_loader;
pub mod texture;

pub use level::{Level, LevelError, LevelRecord};
pub use materials::{MtlData, MtlError, MtlParser};
pub use obj_loader::{ObjError, ObjLoader, ObjModel, SubMesh};
pub use scene_loader::{InstanceRange, SceneGeometry, SceneLoader, StencilMesh};
pub use texture::{PixelFormat, TextureError, TextureImage};
