//! Material definitions
//!
//! Wavefront MTL libraries referenced by the scene's OBJ models.

pub mod mtl_parser;

pub use mtl_parser::{MtlData, MtlError, MtlParser};
