//! Bindless texture table
//!
//! Every texture the scene samples gets a fixed slot in one descriptor array.
//! Shaders index the array with the slot stored in a batch's per-draw table.
//! Slot 0 always holds a 1x1 black texture that stands in for anything that failed
//! to load.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, error};

use crate::assets::texture::{PixelFormat, TextureImage};

/// Size of the descriptor array
pub const MAX_TEXTURES: usize = 128;

/// Slot of the black fallback texture
pub const FALLBACK_SLOT: u32 = 0;

/// Textures keyed by file name, in slot order
#[derive(Debug, Clone)]
pub struct TextureTable {
    images: Vec<TextureImage>,
    slots: HashMap<String, u32>,
}

impl TextureTable {
    /// Table holding only the fallback texture
    pub fn new() -> Self {
        Self {
            images: vec![TextureImage::solid([0, 0, 0, u8::MAX])],
            slots: HashMap::new(),
        }
    }

    /// Slot of `key`, loading it from `path` on first use
    ///
    /// Failures are logged and resolve to [`FALLBACK_SLOT`]; the failure is cached
    /// so the file is not retried.
    pub fn get_or_load(&mut self, key: &str, path: &Path, format: PixelFormat) -> u32 {
        if let Some(&slot) = self.slots.get(key) {
            return slot;
        }

        let slot = match TextureImage::load(path, format, true) {
            Ok(image) => self.insert(key, image),
            Err(e) => {
                error!("{}", e);
                FALLBACK_SLOT
            }
        };
        self.slots.insert(key.to_string(), slot);
        slot
    }

    /// Add an already decoded image under `key`
    pub fn insert(&mut self, key: &str, image: TextureImage) -> u32 {
        if let Some(&slot) = self.slots.get(key) {
            return slot;
        }
        if self.images.len() >= MAX_TEXTURES {
            error!("Texture table full ({} slots), {} uses the fallback", MAX_TEXTURES, key);
            return FALLBACK_SLOT;
        }

        let slot = self.images.len() as u32;
        debug!("Texture slot {} <- {}", slot, key);
        self.images.push(image);
        self.slots.insert(key.to_string(), slot);
        slot
    }

    /// Slot previously assigned to `key`
    pub fn slot(&self, key: &str) -> Option<u32> {
        self.slots.get(key).copied()
    }

    /// Images in slot order
    pub fn images(&self) -> &[TextureImage] {
        &self.images
    }

    /// Number of occupied slots including the fallback
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Never true; slot 0 is always present
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl Default for TextureTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_occupies_slot_zero() {
        let table = TextureTable::new();
        assert_eq!(table.len(), 1);
        assert_eq!(table.images()[0].pixels, vec![0, 0, 0, 255]);
    }

    #[test]
    fn test_insert_deduplicates_by_key() {
        let mut table = TextureTable::new();
        let a = table.insert("a.png", TextureImage::solid([1, 2, 3, 4]));
        let again = table.insert("a.png", TextureImage::solid([9, 9, 9, 9]));
        let b = table.insert("b.png", TextureImage::solid([5, 6, 7, 8]));

        assert_eq!((a, again, b), (1, 1, 2));
        assert_eq!(table.len(), 3);
        assert_eq!(table.slot("b.png"), Some(2));
    }

    #[test]
    fn test_missing_file_resolves_to_fallback_once() {
        let mut table = TextureTable::new();
        let path = Path::new("/nonexistent/missing.png");
        assert_eq!(table.get_or_load("missing.png", path, PixelFormat::Rgb), FALLBACK_SLOT);
        assert_eq!(table.slot("missing.png"), Some(FALLBACK_SLOT));
        assert_eq!(table.len(), 1);
    }
}
