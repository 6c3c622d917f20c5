// Keyboard adapter for winit key events

use std::time::Duration;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use super::{drain_stamped, DeviceAdapter};
use crate::engine::input::keys::normalize_key;
use crate::engine::input::{DeviceType, EventType, InputType, Modifiers, NormalizedInput};

/// Canonical name for a physical key, e.g. `KeyW` -> `"w"`,
/// `ArrowUp` -> `"arrowup"`, `ShiftLeft` -> `"shift"`
pub fn key_name(code: KeyCode) -> String {
    let name = match code {
        KeyCode::ShiftLeft | KeyCode::ShiftRight => "shift",
        KeyCode::ControlLeft | KeyCode::ControlRight => "ctrl",
        KeyCode::AltLeft | KeyCode::AltRight => "alt",
        KeyCode::SuperLeft | KeyCode::SuperRight => "meta",
        _ => {
            let debug = format!("{:?}", code);
            let trimmed = debug
                .strip_prefix("Key")
                .or_else(|| debug.strip_prefix("Digit"))
                .unwrap_or(&debug);
            return normalize_key(DeviceType::Keyboard, trimmed);
        }
    };
    name.to_string()
}

/// Convert winit modifier state into our modifier flags
pub fn modifiers_from_state(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift_key(),
        ctrl: state.control_key(),
        alt: state.alt_key(),
        meta: state.super_key(),
    }
}

/// Collects keyboard input between polls
#[derive(Debug, Default)]
pub struct KeyboardAdapter {
    modifiers: Modifiers,
    queue: Vec<NormalizedInput>,
}

impl KeyboardAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track modifier state from `WindowEvent::ModifiersChanged`
    pub fn set_modifiers(&mut self, state: ModifiersState) {
        self.modifiers = modifiers_from_state(state);
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Process a keyboard event from winit. Keys without a known physical
    /// code are ignored.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.handle_key(code, event.state, event.repeat);
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, state: ElementState, repeat: bool) {
        let event_type = match state {
            ElementState::Pressed if repeat => EventType::Repeat,
            ElementState::Pressed => EventType::Press,
            ElementState::Released => EventType::Release,
        };
        let name = key_name(code);
        let input = match event_type {
            EventType::Release => {
                NormalizedInput::release(DeviceType::Keyboard, InputType::Key, &name)
            }
            _ => NormalizedInput::press(DeviceType::Keyboard, InputType::Key, &name)
                .with_event_type(event_type),
        };
        self.queue.push(input.with_modifiers(self.modifiers));
    }

    /// Number of inputs waiting for the next poll
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl DeviceAdapter for KeyboardAdapter {
    fn device_type(&self) -> DeviceType {
        DeviceType::Keyboard
    }

    fn poll(&mut self, now: Duration) -> Vec<NormalizedInput> {
        drain_stamped(&mut self.queue, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(KeyCode::KeyW), "w");
        assert_eq!(key_name(KeyCode::Digit7), "7");
        assert_eq!(key_name(KeyCode::ArrowUp), "arrowup");
        assert_eq!(key_name(KeyCode::Space), "space");
        assert_eq!(key_name(KeyCode::Escape), "escape");
        assert_eq!(key_name(KeyCode::ShiftRight), "shift");
        assert_eq!(key_name(KeyCode::ControlLeft), "ctrl");
        assert_eq!(key_name(KeyCode::F5), "f5");
    }

    #[test]
    fn test_press_repeat_release() {
        let mut keyboard = KeyboardAdapter::new();
        keyboard.handle_key(KeyCode::KeyA, ElementState::Pressed, false);
        keyboard.handle_key(KeyCode::KeyA, ElementState::Pressed, true);
        keyboard.handle_key(KeyCode::KeyA, ElementState::Released, false);

        let inputs = keyboard.poll(Duration::from_millis(5));
        let kinds: Vec<(EventType, f64)> = inputs.iter().map(|i| (i.event_type, i.value)).collect();
        assert_eq!(
            kinds,
            vec![
                (EventType::Press, 1.0),
                (EventType::Repeat, 1.0),
                (EventType::Release, 0.0)
            ]
        );
        assert!(inputs.iter().all(|i| i.key == "a"));
        assert!(inputs.iter().all(|i| i.timestamp == Duration::from_millis(5)));
        assert_eq!(keyboard.pending(), 0);
    }

    #[test]
    fn test_modifiers_are_attached() {
        let mut keyboard = KeyboardAdapter::new();
        keyboard.set_modifiers(ModifiersState::CONTROL | ModifiersState::SHIFT);
        keyboard.handle_key(KeyCode::KeyC, ElementState::Pressed, false);

        let input = &keyboard.poll(Duration::ZERO)[0];
        assert!(input.modifiers.ctrl);
        assert!(input.modifiers.shift);
        assert!(!input.modifiers.alt);
        assert!(!input.modifiers.meta);
    }
}
