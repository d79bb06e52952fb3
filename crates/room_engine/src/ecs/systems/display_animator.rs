//! Display animator
//!
//! Types a fixed message onto the monitor screens, one character per tick. A
//! space blanks every screen and shortens the next tick; the first glyph after a
//! blank lands on every screen at once, later glyphs on one random screen. Each
//! glyph plays a cue.
//!
//! Only the emissive batch's texture slots change; the frame pipeline uploads
//! them when the table is dirty.

use std::collections::HashMap;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assets::{PixelFormat, SceneGeometry, SceneLoader};
use crate::events::{AudioCue, EventChannel};
use crate::foundation::time::IntervalTimer;
use crate::render::{MaterialClass, FALLBACK_SLOT};

/// Message cycled across the screens
pub const DISPLAY_TEXT: &str = " because we seperate like ripples on a blank shore oh reckoner take me with you";

/// Glyph whose texture shows an empty screen
pub const BLANK_GLYPH: char = '0';

/// Clip played for every typed glyph
pub const AUDIO_CUE_CLIP: &str = "audio/cut.wav";

/// Interval after a blank tick, and before the first tick
pub const BLANK_INTERVAL: f32 = 3.0;

/// Interval after a glyph tick
pub const GLYPH_INTERVAL: f32 = 4.0;

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTick {
    /// Every screen blanked
    Blank,
    /// Every screen shows `glyph`
    Uniform(char),
    /// Only the screen drawn by `draw_id` shows `glyph`
    Single {
        /// Emissive draw id that changed
        draw_id: u32,
        /// Character now shown
        glyph: char,
    },
}

/// Typewriter animation over the monitors' emissive texture slots
pub struct DisplayAnimator {
    text: Vec<char>,
    glyph_slots: HashMap<char, u32>,
    draws: Vec<u32>,
    cursor: usize,
    timer: IntervalTimer,
    uniform_next: bool,
    rng: StdRng,
}

impl DisplayAnimator {
    /// Load every glyph texture of [`DISPLAY_TEXT`] and track each display type's draw
    ///
    /// Must run before the scene is uploaded so the glyphs get texture slots. A
    /// glyph that fails to load shows the fallback texture.
    pub fn new(loader: &SceneLoader, scene: &mut SceneGeometry) -> Self {
        let mut glyph_slots = HashMap::new();
        for glyph in DISPLAY_TEXT.chars().filter(|&c| c != ' ').chain(std::iter::once(BLANK_GLYPH)) {
            glyph_slots.entry(glyph).or_insert_with(|| {
                loader.texture_slot(&mut scene.textures, &format!("textures/{glyph}.png"), PixelFormat::Rgb)
            });
        }

        let draws: Vec<u32> = scene.display_draws.values().copied().collect();
        if draws.is_empty() {
            warn!("No display surfaces in the scene; the animator will only cue");
        }
        debug!("Display animator: {} glyphs, {} screens", glyph_slots.len(), draws.len());

        Self::with_glyphs(DISPLAY_TEXT, glyph_slots, draws, StdRng::from_entropy())
    }

    /// Animator over already resolved glyph slots
    pub fn with_glyphs(text: &str, glyph_slots: HashMap<char, u32>, draws: Vec<u32>, rng: StdRng) -> Self {
        Self {
            text: text.chars().collect(),
            glyph_slots,
            draws,
            cursor: 0,
            timer: IntervalTimer::new(BLANK_INTERVAL),
            uniform_next: true,
            rng,
        }
    }

    /// Seconds until the next tick fires, counted from the last one
    pub fn interval(&self) -> f32 {
        self.timer.interval()
    }

    /// Index of the character the next tick shows
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Advance by `dt`; at most one tick fires per call
    pub fn update(&mut self, dt: f32, scene: &mut SceneGeometry, cues: &mut EventChannel<AudioCue>) -> Option<DisplayTick> {
        if !self.timer.tick(dt) || self.text.is_empty() {
            return None;
        }

        let glyph = self.text[self.cursor];
        self.cursor = (self.cursor + 1) % self.text.len();

        let tick = if glyph == ' ' {
            let slot = self.slot(BLANK_GLYPH);
            self.set_all(scene, slot);
            self.timer.set_interval(BLANK_INTERVAL);
            self.uniform_next = true;
            DisplayTick::Blank
        } else {
            let slot = self.slot(glyph);
            let tick = if self.uniform_next || self.draws.is_empty() {
                self.set_all(scene, slot);
                DisplayTick::Uniform(glyph)
            } else {
                let draw_id = self.draws[self.rng.gen_range(0..self.draws.len())];
                self.set(scene, draw_id, slot);
                DisplayTick::Single { draw_id, glyph }
            };
            self.timer.set_interval(GLYPH_INTERVAL);
            self.uniform_next = false;
            cues.publish(AudioCue {
                clip: AUDIO_CUE_CLIP.to_string(),
            });
            tick
        };

        debug!("Display tick {:?}", tick);
        Some(tick)
    }

    fn slot(&self, glyph: char) -> u32 {
        self.glyph_slots.get(&glyph).copied().unwrap_or(FALLBACK_SLOT)
    }

    fn set_all(&self, scene: &mut SceneGeometry, slot: u32) {
        for &draw_id in &self.draws {
            self.set(scene, draw_id, slot);
        }
    }

    fn set(&self, scene: &mut SceneGeometry, draw_id: u32, slot: u32) {
        let handles = scene.batches.get_mut(MaterialClass::Emissive).textures_mut();
        if !handles.set(draw_id, slot) {
            warn!("Display draw {} outside the emissive batch", draw_id);
        }
    }
}
