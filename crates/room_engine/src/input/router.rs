//! Input router
//!
//! Classifies polled events into gestures. One mouse button owns the pointer at a
//! time: the first button pressed wins and the others are ignored until it is
//! released. Motion is routed by the owning button:
//! - left: absolute drag positions for the picker
//! - right: relative x for camera yaw
//! - middle: relative y for camera pitch
//!
//! The wheel always feeds the camera radius.

use std::collections::VecDeque;

use log::{debug, trace};

use super::{ButtonAction, InputEvent, KeyCode, MouseButton};
use crate::ecs::DrawMode;
use crate::events::{InputChannels, PitchDrag, PointerEvent, Scroll, YawDrag};

/// Lifecycle requests sent to the external state layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMessage {
    /// Nothing to do
    #[default]
    None,
    /// Leave the application
    Quit,
    /// Pop the current state
    Pop,
    /// Push the main menu
    PushMainMenu,
    /// Push the play state
    PushPlay,
}

/// Per-button state machine plus cursor tracking
#[derive(Debug, Default)]
pub struct InputRouter {
    active_button: Option<MouseButton>,
    cursor: Option<(f32, f32)>,
}

impl InputRouter {
    /// Create a router with every button idle
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cursor position before the first motion event arrives
    ///
    /// Without it a press before any motion would pick at the window origin.
    pub fn set_cursor(&mut self, x: f32, y: f32) {
        self.cursor = Some((x, y));
    }

    /// Last known cursor position
    pub fn cursor(&self) -> Option<(f32, f32)> {
        self.cursor
    }

    /// Button currently owning the pointer
    pub fn active_button(&self) -> Option<MouseButton> {
        self.active_button
    }

    /// Route a frame's worth of events
    ///
    /// Returns `false` when a lifecycle message was queued; the remaining events of
    /// the frame are not consumed.
    pub fn process<I>(
        &mut self,
        events: I,
        channels: &mut InputChannels,
        messages: &mut VecDeque<StateMessage>,
    ) -> bool
    where
        I: IntoIterator<Item = InputEvent>,
    {
        for event in events {
            match event {
                InputEvent::MouseButton { button, action: ButtonAction::Pressed } => {
                    self.button_down(button, channels);
                }
                InputEvent::MouseButton { button, action: ButtonAction::Released } => {
                    self.button_up(button, channels);
                }
                InputEvent::CursorMoved { x, y } => self.cursor_moved(x, y, channels),
                InputEvent::Scroll(delta) => {
                    if delta != 0.0 {
                        channels.scroll.publish(Scroll(delta));
                    }
                }
                InputEvent::KeyPressed(key) => {
                    if let Some(message) = self.key_pressed(key, channels) {
                        debug!("Input requested {:?}", message);
                        messages.push_back(message);
                        return false;
                    }
                }
                InputEvent::CloseRequested => {
                    debug!("Window close requested");
                    messages.push_back(StateMessage::Quit);
                    return false;
                }
            }
        }
        true
    }

    fn button_down(&mut self, button: MouseButton, channels: &mut InputChannels) {
        if self.active_button.is_some() {
            return;
        }
        self.active_button = Some(button);

        if button == MouseButton::Left {
            let (x, y) = self.cursor.unwrap_or((0.0, 0.0));
            trace!("Left press at ({}, {})", x, y);
            channels.pointer.publish(PointerEvent::Pressed { x, y });
        }
    }

    fn button_up(&mut self, button: MouseButton, channels: &mut InputChannels) {
        if self.active_button != Some(button) {
            return;
        }
        self.active_button = None;

        if button == MouseButton::Left {
            channels.pointer.publish(PointerEvent::Released);
        }
    }

    fn cursor_moved(&mut self, x: f32, y: f32, channels: &mut InputChannels) {
        let (rel_x, rel_y) = match self.cursor {
            Some((last_x, last_y)) => (x - last_x, y - last_y),
            None => (0.0, 0.0),
        };
        self.cursor = Some((x, y));

        match self.active_button {
            Some(MouseButton::Left) => channels.pointer.publish(PointerEvent::Dragged { x, y }),
            Some(MouseButton::Right) if rel_x != 0.0 => channels.yaw.publish(YawDrag(rel_x)),
            Some(MouseButton::Middle) if rel_y != 0.0 => channels.pitch.publish(PitchDrag(rel_y)),
            _ => {}
        }
    }

    fn key_pressed(&mut self, key: KeyCode, channels: &mut InputChannels) -> Option<StateMessage> {
        let mode = match key {
            KeyCode::Digit1 => DrawMode::Normal,
            KeyCode::Digit2 => DrawMode::NormalDebug,
            KeyCode::Digit3 => DrawMode::Debug,
            KeyCode::Escape => return Some(StateMessage::Pop),
            KeyCode::Other => return None,
        };
        channels.draw_mode.publish(mode);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(button: MouseButton) -> InputEvent {
        InputEvent::MouseButton { button, action: ButtonAction::Pressed }
    }

    fn release(button: MouseButton) -> InputEvent {
        InputEvent::MouseButton { button, action: ButtonAction::Released }
    }

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::CursorMoved { x, y }
    }

    #[test]
    fn test_left_press_drag_release() {
        let mut router = InputRouter::new();
        let mut channels = InputChannels::new();
        let pointer = channels.pointer.subscribe();
        let yaw = channels.yaw.subscribe();
        let mut messages = VecDeque::new();

        let events = [moved(10.0, 20.0), press(MouseButton::Left), moved(15.0, 25.0), release(MouseButton::Left)];
        assert!(router.process(events, &mut channels, &mut messages));

        assert_eq!(
            pointer.drain(),
            vec![
                PointerEvent::Pressed { x: 10.0, y: 20.0 },
                PointerEvent::Dragged { x: 15.0, y: 25.0 },
                PointerEvent::Released,
            ]
        );
        assert_eq!(yaw.pending(), 0);
        assert!(messages.is_empty());
        assert_eq!(router.active_button(), None);
    }

    #[test]
    fn test_release_then_press_keeps_order() {
        let mut router = InputRouter::new();
        let mut channels = InputChannels::new();
        let pointer = channels.pointer.subscribe();
        let mut messages = VecDeque::new();

        router.process([moved(5.0, 5.0), press(MouseButton::Left)], &mut channels, &mut messages);
        pointer.drain();

        router.process([release(MouseButton::Left), press(MouseButton::Left)], &mut channels, &mut messages);
        assert_eq!(pointer.drain(), vec![PointerEvent::Released, PointerEvent::Pressed { x: 5.0, y: 5.0 }]);
    }

    #[test]
    fn test_seeded_cursor_is_used_before_any_motion() {
        let mut router = InputRouter::new();
        let mut channels = InputChannels::new();
        let pointer = channels.pointer.subscribe();
        let mut messages = VecDeque::new();

        router.set_cursor(120.0, 80.0);
        router.process([press(MouseButton::Left), moved(125.0, 80.0)], &mut channels, &mut messages);

        assert_eq!(
            pointer.drain(),
            vec![PointerEvent::Pressed { x: 120.0, y: 80.0 }, PointerEvent::Dragged { x: 125.0, y: 80.0 }]
        );
        assert_eq!(router.cursor(), Some((125.0, 80.0)));
    }

    #[test]
    fn test_first_button_wins() {
        let mut router = InputRouter::new();
        let mut channels = InputChannels::new();
        let pointer = channels.pointer.subscribe();
        let yaw = channels.yaw.subscribe();
        let mut messages = VecDeque::new();

        let events = [
            moved(0.0, 0.0),
            press(MouseButton::Right),
            press(MouseButton::Left),
            moved(4.0, 0.0),
            release(MouseButton::Left),
            moved(6.0, 0.0),
        ];
        router.process(events, &mut channels, &mut messages);

        assert_eq!(pointer.pending(), 0);
        assert_eq!(yaw.drain(), vec![YawDrag(4.0), YawDrag(2.0)]);
        assert_eq!(router.active_button(), Some(MouseButton::Right));
    }

    #[test]
    fn test_middle_drag_feeds_pitch_and_scroll_always_publishes() {
        let mut router = InputRouter::new();
        let mut channels = InputChannels::new();
        let pitch = channels.pitch.subscribe();
        let scroll = channels.scroll.subscribe();
        let mut messages = VecDeque::new();

        let events = [moved(0.0, 0.0), press(MouseButton::Middle), moved(0.0, -3.0), InputEvent::Scroll(1.0)];
        router.process(events, &mut channels, &mut messages);

        assert_eq!(pitch.drain(), vec![PitchDrag(-3.0)]);
        assert_eq!(scroll.drain(), vec![Scroll(1.0)]);
    }

    #[test]
    fn test_draw_mode_keys() {
        let mut router = InputRouter::new();
        let mut channels = InputChannels::new();
        let modes = channels.draw_mode.subscribe();
        let mut messages = VecDeque::new();

        let events = [
            InputEvent::KeyPressed(KeyCode::Digit2),
            InputEvent::KeyPressed(KeyCode::Digit3),
            InputEvent::KeyPressed(KeyCode::Digit1),
            InputEvent::KeyPressed(KeyCode::Other),
        ];
        assert!(router.process(events, &mut channels, &mut messages));
        assert_eq!(modes.drain(), vec![DrawMode::NormalDebug, DrawMode::Debug, DrawMode::Normal]);
    }

    #[test]
    fn test_escape_and_close_end_polling() {
        let mut router = InputRouter::new();
        let mut channels = InputChannels::new();
        let scroll = channels.scroll.subscribe();
        let mut messages = VecDeque::new();

        let events = [InputEvent::KeyPressed(KeyCode::Escape), InputEvent::Scroll(1.0)];
        assert!(!router.process(events, &mut channels, &mut messages));
        assert_eq!(messages.pop_front(), Some(StateMessage::Pop));
        assert_eq!(scroll.pending(), 0);

        assert!(!router.process([InputEvent::CloseRequested], &mut channels, &mut messages));
        assert_eq!(messages.pop_front(), Some(StateMessage::Quit));
    }
}
