//! Texture image loading
//!
//! Decodes image files with the `image` crate into tightly packed RGBA8 pixels
//! ready for upload. Model textures are stored as RGB and expanded here; the
//! overlay texture keeps its own alpha.

use std::path::Path;

use thiserror::Error;

/// Texture loading errors
#[derive(Error, Debug)]
pub enum TextureError {
    /// File missing or undecodable
    #[error("failed to load texture {path}: {source}")]
    Decode {
        /// Offending file
        path: String,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },
    /// Zero-sized image
    #[error("texture {0} has no pixels")]
    Empty(String),
}

/// Channel layout of the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Color only; alpha becomes opaque
    Rgb,
    /// Color with alpha
    Rgba,
}

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA8 pixels, rows bottom-up when loaded flipped
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Load and decode an image file
    ///
    /// `flip` mirrors the rows so v = 0 addresses the bottom of the file, matching
    /// the texture coordinates exported with the models.
    pub fn load(path: &Path, format: PixelFormat, flip: bool) -> Result<Self, TextureError> {
        let decoded = image::open(path).map_err(|source| TextureError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        let decoded = if flip { decoded.flipv() } else { decoded };

        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(TextureError::Empty(path.display().to_string()));
        }

        let pixels = match format {
            PixelFormat::Rgb => decoded
                .to_rgb8()
                .pixels()
                .flat_map(|p| [p[0], p[1], p[2], u8::MAX])
                .collect(),
            PixelFormat::Rgba => decoded.to_rgba8().into_raw(),
        };

        log::debug!("Loaded texture {}x{} from {:?}", width, height, path);
        Ok(Self { width, height, pixels })
    }

    /// 1x1 image of a single color
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: color.to_vec(),
        }
    }

    /// Mip chain length down to 1x1
    pub fn mip_levels(&self) -> u32 {
        32 - self.width.max(self.height).max(1).leading_zeros()
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.pixels.len()
    }
}
