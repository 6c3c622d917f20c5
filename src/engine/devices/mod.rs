// Device adapters
//
// Each adapter turns one family of platform events into `NormalizedInput`s.
// Keyboard and mouse adapters are fed from the winit event loop and drained
// once per frame; the gamepad adapter diffs polled snapshots and is usually
// registered on the input manager with `InputManager::add_device`.

use std::time::Duration;

use crate::engine::input::{DeviceType, NormalizedInput};

mod gamepad;
mod keyboard;
mod mouse;

pub use gamepad::{
    GamepadAdapter, GamepadSnapshot, GamepadSource, AXIS_EPSILON, AXIS_NAMES, BUTTON_NAMES,
    BUTTON_THRESHOLD,
};
pub use keyboard::{key_name, KeyboardAdapter};
pub use mouse::{button_name, MouseAdapter};

/// A source of normalized input
pub trait DeviceAdapter {
    fn device_type(&self) -> DeviceType;

    /// Inputs produced since the last poll, oldest first. Inputs without a
    /// timestamp are stamped with `now`.
    fn poll(&mut self, now: Duration) -> Vec<NormalizedInput>;
}

/// Drain `queue`, stamping untimed inputs with `now`
fn drain_stamped(queue: &mut Vec<NormalizedInput>, now: Duration) -> Vec<NormalizedInput> {
    queue
        .drain(..)
        .map(|input| {
            if input.timestamp.is_zero() {
                input.at(now)
            } else {
                input
            }
        })
        .collect()
}
