//! Input handling
//!
//! Platform-neutral input events and the router that turns them into gestures.
//! The windowing layer converts its native events into [`InputEvent`]s; the router
//! classifies them and publishes to the typed channels in [`crate::events`].

pub mod picking;
pub mod router;

pub use picking::{pick_ray, screen_to_ndc, PickRay};
pub use router::{InputRouter, StateMessage};

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Number row 1
    Digit1,
    /// Number row 2
    Digit2,
    /// Number row 3
    Digit3,
    /// Escape key
    Escape,
    /// Any key without a binding
    Other,
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

/// Press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Went down
    Pressed,
    /// Went up
    Released,
}

/// A single polled platform event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Mouse button changed state
    MouseButton {
        /// Which button
        button: MouseButton,
        /// Press or release
        action: ButtonAction,
    },
    /// Cursor moved to absolute window coordinates
    CursorMoved {
        /// Cursor x in pixels
        x: f32,
        /// Cursor y in pixels
        y: f32,
    },
    /// Wheel moved; positive is away from the user
    Scroll(f32),
    /// Key pressed
    KeyPressed(KeyCode),
    /// Window close requested
    CloseRequested,
}
