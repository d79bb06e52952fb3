//! Event system
//!
//! Gesture and notification payloads plus the typed channels that carry them.
//! The input router publishes gestures; the camera and physics picker subscribe.
//! The display animator publishes audio cues; the application subscribes a sink.

pub mod channel;

pub use channel::{EventChannel, SubscriberKey, Subscription};

use crate::ecs::DrawMode;

/// Left-button gesture, published in the order it happened
///
/// Press, drag and release share one channel so a release followed by a new
/// press within a frame reaches the picker in that order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Left button went down at absolute window coordinates
    Pressed {
        /// Cursor x in pixels
        x: f32,
        /// Cursor y in pixels
        y: f32,
    },
    /// Cursor moved while the left button is held
    Dragged {
        /// Cursor x in pixels
        x: f32,
        /// Cursor y in pixels
        y: f32,
    },
    /// Left button went up
    Released,
}

/// Relative horizontal motion while the yaw button is held
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawDrag(pub f32);

/// Relative vertical motion while the pitch button is held
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchDrag(pub f32);

/// Wheel movement; positive scrolls up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scroll(pub f32);

/// Request to play a sound clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCue {
    /// Clip path relative to the asset root
    pub clip: String,
}

/// One channel per gesture kind
#[derive(Default)]
pub struct InputChannels {
    /// Pick, drag and release
    pub pointer: EventChannel<PointerEvent>,
    /// Camera yaw
    pub yaw: EventChannel<YawDrag>,
    /// Camera pitch
    pub pitch: EventChannel<PitchDrag>,
    /// Camera radius
    pub scroll: EventChannel<Scroll>,
    /// Draw mode selection
    pub draw_mode: EventChannel<DrawMode>,
}

impl InputChannels {
    /// Create channels with no subscribers
    pub fn new() -> Self {
        Self::default()
    }
}
