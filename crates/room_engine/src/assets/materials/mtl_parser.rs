//! MTL (Material Template Library) file parser
//!
//! Parses Wavefront .mtl files into structured data. Only the properties the
//! viewer shades with are interpreted:
//! - `Kd` flat color for untextured sub-meshes
//! - `map_Kd` the diffuse texture
//! - `map_Ke` marks a sub-mesh as self-illuminated
//!
//! The remaining Phong terms are parsed so libraries round-trip cleanly, and
//! anything unrecognized is logged and skipped.

use std::collections::HashMap;

use log::warn;
use thiserror::Error;

use crate::foundation::math::Vec3;

/// MTL parsing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MtlError {
    /// A statement is missing a required value
    #[error("line {line}: {command} missing value")]
    MissingValue {
        /// 1-based line number
        line: usize,
        /// Statement keyword
        command: String,
    },
    /// A value did not parse as a number
    #[error("line {line}: {command} invalid value '{value}'")]
    InvalidValue {
        /// 1-based line number
        line: usize,
        /// Statement keyword
        command: String,
        /// Offending token
        value: String,
    },
}

/// Parsed MTL material data (Wavefront Phong model)
#[derive(Debug, Clone, PartialEq)]
pub struct MtlData {
    /// Material name
    pub name: String,
    /// Ambient color (Ka)
    pub ambient: Vec3,
    /// Diffuse color (Kd)
    pub diffuse: Vec3,
    /// Specular color (Ks)
    pub specular: Vec3,
    /// Emission color (Ke)
    pub emission: Vec3,
    /// Specular exponent (Ns)
    pub specular_exponent: f32,
    /// Dissolve/opacity (d)
    pub dissolve: f32,
    /// Diffuse texture map (map_Kd)
    pub diffuse_map: Option<String>,
    /// Emission texture map (map_Ke)
    pub emission_map: Option<String>,
}

impl Default for MtlData {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: Vec3::new(1.0, 1.0, 1.0),
            diffuse: Vec3::new(0.8, 0.8, 0.8),
            specular: Vec3::new(0.5, 0.5, 0.5),
            emission: Vec3::zeros(),
            specular_exponent: 250.0,
            dissolve: 1.0,
            diffuse_map: None,
            emission_map: None,
        }
    }
}

impl MtlData {
    /// Flat RGBA color used when no diffuse map is present
    pub fn flat_color(&self) -> [f32; 4] {
        [self.diffuse.x, self.diffuse.y, self.diffuse.z, 1.0]
    }
}

/// MTL file parser
pub struct MtlParser;

impl MtlParser {
    /// Parse MTL file contents into a map of material name -> MtlData
    pub fn parse(contents: &str) -> Result<HashMap<String, MtlData>, MtlError> {
        let mut materials = HashMap::new();
        let mut current: Option<MtlData> = None;

        for (index, line) in contents.lines().enumerate() {
            let line_num = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(command) = tokens.next() else {
                continue;
            };

            if command == "newmtl" {
                if let Some(material) = current.take() {
                    materials.insert(material.name.clone(), material);
                }
                let name = Self::rest_of_line(&mut tokens, line_num, command)?;
                current = Some(MtlData { name, ..Default::default() });
                continue;
            }

            let Some(material) = current.as_mut() else {
                warn!("MTL line {}: {} before any newmtl", line_num, command);
                continue;
            };

            match command {
                "Ka" => material.ambient = Self::parse_vec3(&mut tokens, line_num, command)?,
                "Kd" => material.diffuse = Self::parse_vec3(&mut tokens, line_num, command)?,
                "Ks" => material.specular = Self::parse_vec3(&mut tokens, line_num, command)?,
                "Ke" => material.emission = Self::parse_vec3(&mut tokens, line_num, command)?,
                "Ns" => material.specular_exponent = Self::parse_f32(&mut tokens, line_num, command)?,
                "d" => material.dissolve = Self::parse_f32(&mut tokens, line_num, command)?,
                "Tr" => material.dissolve = 1.0 - Self::parse_f32(&mut tokens, line_num, command)?,
                "map_Kd" => material.diffuse_map = Some(Self::rest_of_line(&mut tokens, line_num, command)?),
                "map_Ke" => material.emission_map = Some(Self::rest_of_line(&mut tokens, line_num, command)?),
                // Parsed by every exporter, unused by the shaders
                "illum" | "Ni" | "map_Ks" | "map_Ka" | "map_Bump" | "bump" | "map_d" => {}
                _ => warn!("MTL line {}: unsupported statement {}", line_num, command),
            }
        }

        if let Some(material) = current {
            materials.insert(material.name.clone(), material);
        }

        Ok(materials)
    }

    fn parse_vec3<'a, I>(tokens: &mut I, line: usize, command: &str) -> Result<Vec3, MtlError>
    where
        I: Iterator<Item = &'a str>,
    {
        let r = Self::parse_f32(tokens, line, command)?;
        let g = Self::parse_f32(tokens, line, command)?;
        let b = Self::parse_f32(tokens, line, command)?;
        Ok(Vec3::new(r, g, b))
    }

    fn parse_f32<'a, I>(tokens: &mut I, line: usize, command: &str) -> Result<f32, MtlError>
    where
        I: Iterator<Item = &'a str>,
    {
        let token = tokens.next().ok_or_else(|| MtlError::MissingValue {
            line,
            command: command.to_string(),
        })?;
        token.parse::<f32>().map_err(|_| MtlError::InvalidValue {
            line,
            command: command.to_string(),
            value: token.to_string(),
        })
    }

    /// Texture paths and names may contain spaces
    fn rest_of_line<'a, I>(tokens: &mut I, line: usize, command: &str) -> Result<String, MtlError>
    where
        I: Iterator<Item = &'a str>,
    {
        let parts: Vec<&str> = tokens.collect();
        if parts.is_empty() {
            return Err(MtlError::MissingValue {
                line,
                command: command.to_string(),
            });
        }
        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_flat_material() {
        let mtl_content = r#"
# Simple material
newmtl Wood
Ka 1.0 1.0 1.0
Kd 0.8 0.2 0.2
Ns 250.0
illum 2
"#;

        let materials = MtlParser::parse(mtl_content).unwrap();
        let mat = materials.get("Wood").unwrap();
        assert_eq!(mat.flat_color(), [0.8, 0.2, 0.2, 1.0]);
        assert!(mat.diffuse_map.is_none());
        assert_relative_eq!(mat.specular_exponent, 250.0);
    }

    #[test]
    fn test_parse_texture_maps() {
        let mtl_content = r#"
newmtl Screen
Kd 1.0 1.0 1.0
map_Kd textures/screen glow.png
map_Ke textures/screen_e.png
"#;

        let materials = MtlParser::parse(mtl_content).unwrap();
        let mat = materials.get("Screen").unwrap();
        assert_eq!(mat.diffuse_map.as_deref(), Some("textures/screen glow.png"));
        assert_eq!(mat.emission_map.as_deref(), Some("textures/screen_e.png"));
    }

    #[test]
    fn test_parse_multiple_materials_and_transparency() {
        let mtl_content = r#"
newmtl A
Kd 1.0 0.0 0.0
Tr 0.3

newmtl B
Kd 0.0 1.0 0.0
"#;

        let materials = MtlParser::parse(mtl_content).unwrap();
        assert_eq!(materials.len(), 2);
        assert_relative_eq!(materials["A"].dissolve, 0.7, epsilon = 1e-6);
        assert_eq!(materials["B"].diffuse, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_invalid_value_reports_line() {
        let result = MtlParser::parse("newmtl A\nKd 1.0 oops 0.0\n");
        assert_eq!(
            result,
            Err(MtlError::InvalidValue { line: 2, command: "Kd".to_string(), value: "oops".to_string() })
        );
    }
}
