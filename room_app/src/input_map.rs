//! glfw event translation
//!
//! Maps the raw window events onto the engine's platform-neutral
//! [`InputEvent`]s. Events the router has no use for map to `None`.

use glfw::{Action, Key, WindowEvent};
use room_engine::input::{ButtonAction, InputEvent, KeyCode, MouseButton};

/// Translate one glfw event
pub fn to_input_event(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::MouseButton(button, action, _) => {
            let button = match button {
                glfw::MouseButton::Button1 => MouseButton::Left,
                glfw::MouseButton::Button2 => MouseButton::Right,
                glfw::MouseButton::Button3 => MouseButton::Middle,
                _ => return None,
            };
            let action = match action {
                Action::Press => ButtonAction::Pressed,
                Action::Release => ButtonAction::Released,
                Action::Repeat => return None,
            };
            Some(InputEvent::MouseButton { button, action })
        }
        WindowEvent::CursorPos(x, y) => Some(InputEvent::CursorMoved {
            x: *x as f32,
            y: *y as f32,
        }),
        WindowEvent::Scroll(_, y) => Some(InputEvent::Scroll(*y as f32)),
        WindowEvent::Key(key, _, Action::Press, _) => Some(InputEvent::KeyPressed(key_code(*key))),
        WindowEvent::Close => Some(InputEvent::CloseRequested),
        _ => None,
    }
}

fn key_code(key: Key) -> KeyCode {
    match key {
        Key::Num1 | Key::Kp1 => KeyCode::Digit1,
        Key::Num2 | Key::Kp2 => KeyCode::Digit2,
        Key::Num3 | Key::Kp3 => KeyCode::Digit3,
        Key::Escape => KeyCode::Escape,
        _ => KeyCode::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glfw::Modifiers;

    #[test]
    fn test_mouse_buttons_map_left_right_middle() {
        let press = |button| to_input_event(&WindowEvent::MouseButton(button, Action::Press, Modifiers::empty()));

        assert_eq!(
            press(glfw::MouseButton::Button1),
            Some(InputEvent::MouseButton { button: MouseButton::Left, action: ButtonAction::Pressed })
        );
        assert_eq!(
            press(glfw::MouseButton::Button2),
            Some(InputEvent::MouseButton { button: MouseButton::Right, action: ButtonAction::Pressed })
        );
        assert_eq!(
            press(glfw::MouseButton::Button3),
            Some(InputEvent::MouseButton { button: MouseButton::Middle, action: ButtonAction::Pressed })
        );
        assert_eq!(press(glfw::MouseButton::Button5), None);
    }

    #[test]
    fn test_keys_only_on_press() {
        let key = |key, action| to_input_event(&WindowEvent::Key(key, 0, action, Modifiers::empty()));

        assert_eq!(key(Key::Num2, Action::Press), Some(InputEvent::KeyPressed(KeyCode::Digit2)));
        assert_eq!(key(Key::Escape, Action::Press), Some(InputEvent::KeyPressed(KeyCode::Escape)));
        assert_eq!(key(Key::A, Action::Press), Some(InputEvent::KeyPressed(KeyCode::Other)));
        assert_eq!(key(Key::Num2, Action::Release), None);
        assert_eq!(key(Key::Num2, Action::Repeat), None);
    }

    #[test]
    fn test_scroll_uses_vertical_offset() {
        assert_eq!(to_input_event(&WindowEvent::Scroll(3.0, -1.0)), Some(InputEvent::Scroll(-1.0)));
        assert_eq!(
            to_input_event(&WindowEvent::CursorPos(10.5, 20.0)),
            Some(InputEvent::CursorMoved { x: 10.5, y: 20.0 })
        );
        assert_eq!(to_input_event(&WindowEvent::Close), Some(InputEvent::CloseRequested));
        assert_eq!(to_input_event(&WindowEvent::Focus(true)), None);
    }
}
