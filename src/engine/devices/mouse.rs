// Mouse adapter for winit button, wheel and motion events

use std::collections::BTreeSet;
use std::time::Duration;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::ModifiersState;

use super::keyboard::modifiers_from_state;
use super::{drain_stamped, DeviceAdapter};
use crate::engine::input::{DeviceType, EventType, InputType, Modifiers, NormalizedInput};

/// Pixel scroll distance treated as one wheel line
const PIXELS_PER_LINE: f64 = 40.0;

/// Canonical name for a mouse button
pub fn button_name(button: MouseButton) -> String {
    match button {
        MouseButton::Left => "left".to_string(),
        MouseButton::Right => "right".to_string(),
        MouseButton::Middle => "middle".to_string(),
        MouseButton::Back => "back".to_string(),
        MouseButton::Forward => "forward".to_string(),
        MouseButton::Other(n) => format!("button{}", n),
    }
}

/// Collects mouse input between polls.
///
/// Wheel and movement readings are impulses: an axis that moved during one
/// poll is reported back at zero on the next poll unless it moved again.
#[derive(Debug, Default)]
pub struct MouseAdapter {
    modifiers: Modifiers,
    last_position: Option<PhysicalPosition<f64>>,
    queue: Vec<NormalizedInput>,
    moving_axes: BTreeSet<&'static str>,
}

impl MouseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_modifiers(&mut self, state: ModifiersState) {
        self.modifiers = modifiers_from_state(state);
    }

    pub fn handle_button(&mut self, button: MouseButton, state: ElementState) {
        let name = button_name(button);
        let input = match state {
            ElementState::Pressed => {
                NormalizedInput::press(DeviceType::Mouse, InputType::Button, &name)
            }
            ElementState::Released => {
                NormalizedInput::release(DeviceType::Mouse, InputType::Button, &name)
            }
        };
        self.queue.push(input.with_modifiers(self.modifiers));
    }

    /// Wheel deltas in lines; pixel deltas are converted
    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let (x, y) = match delta {
            MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
            MouseScrollDelta::PixelDelta(pos) => (pos.x / PIXELS_PER_LINE, pos.y / PIXELS_PER_LINE),
        };
        self.push_axis("wheelx", InputType::Wheel, x);
        self.push_axis("wheely", InputType::Wheel, y);
    }

    /// Raw relative motion, e.g. from `DeviceEvent::MouseMotion`
    pub fn handle_motion(&mut self, dx: f64, dy: f64) {
        self.push_axis("movex", InputType::Movement, dx);
        self.push_axis("movey", InputType::Movement, dy);
    }

    /// Cursor position from `WindowEvent::CursorMoved`; reported as motion
    /// relative to the previous position
    pub fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        if let Some(last) = self.last_position {
            self.handle_motion(position.x - last.x, position.y - last.y);
        }
        self.last_position = Some(position);
    }

    /// Forget the cursor position, e.g. on `WindowEvent::CursorLeft`
    pub fn cursor_left(&mut self) {
        self.last_position = None;
    }

    fn push_axis(&mut self, axis: &'static str, input_type: InputType, value: f64) {
        if value == 0.0 {
            return;
        }
        self.queue.push(
            NormalizedInput::analog(DeviceType::Mouse, input_type, axis, value)
                .with_modifiers(self.modifiers),
        );
    }
}

impl DeviceAdapter for MouseAdapter {
    fn device_type(&self) -> DeviceType {
        DeviceType::Mouse
    }

    fn poll(&mut self, now: Duration) -> Vec<NormalizedInput> {
        let mut inputs = drain_stamped(&mut self.queue, now);

        let moved: BTreeSet<&'static str> = inputs
            .iter()
            .filter(|i| i.event_type == EventType::Analog)
            .filter_map(|i| match i.key.as_str() {
                "wheelx" => Some("wheelx"),
                "wheely" => Some("wheely"),
                "movex" => Some("movex"),
                "movey" => Some("movey"),
                _ => None,
            })
            .collect();

        for axis in self.moving_axes.difference(&moved) {
            let input_type = if axis.starts_with("wheel") {
                InputType::Wheel
            } else {
                InputType::Movement
            };
            inputs.push(NormalizedInput::analog(DeviceType::Mouse, input_type, axis, 0.0).at(now));
        }
        self.moving_axes = moved;
        inputs
    }
}
