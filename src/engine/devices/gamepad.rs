// Gamepad adapter: turns polled controller snapshots into input transitions

use log::debug;
use std::collections::BTreeMap;
use std::time::Duration;

use super::DeviceAdapter;
use crate::core::analog::{approx_equal, clamp};
use crate::engine::input::{DeviceType, InputType, NormalizedInput};

/// Button names in standard-mapping order
pub const BUTTON_NAMES: [&str; 17] = [
    "button_a",
    "button_b",
    "button_x",
    "button_y",
    "left_bumper",
    "right_bumper",
    "left_trigger",
    "right_trigger",
    "select",
    "start",
    "left_stick",
    "right_stick",
    "dpad_up",
    "dpad_down",
    "dpad_left",
    "dpad_right",
    "home",
];

/// Axis names in standard-mapping order
pub const AXIS_NAMES: [&str; 4] = ["leftstickx", "leftsticky", "rightstickx", "rightsticky"];

/// Button reading above which a digital button counts as pressed
pub const BUTTON_THRESHOLD: f64 = 0.5;

/// Smallest axis or trigger change that is reported
pub const AXIS_EPSILON: f64 = 0.01;

/// Indices of the analog triggers within `BUTTON_NAMES`
const TRIGGER_BUTTONS: [usize; 2] = [6, 7];

/// Whether an axis moved enough to report; returning to rest always counts
fn analog_changed(old: f64, new: f64) -> bool {
    !approx_equal(old, new, AXIS_EPSILON) || (new == 0.0 && old != 0.0)
}

/// One controller's state at a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadSnapshot {
    /// Slot of the controller, stable while it stays connected
    pub index: usize,
    /// Button readings in `[0, 1]`, standard-mapping order
    pub buttons: Vec<f64>,
    /// Axis readings in `[-1, 1]`, standard-mapping order
    pub axes: Vec<f64>,
}

impl GamepadSnapshot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            buttons: vec![0.0; BUTTON_NAMES.len()],
            axes: vec![0.0; AXIS_NAMES.len()],
        }
    }

    fn button(&self, i: usize) -> f64 {
        clamp(self.buttons.get(i).copied().unwrap_or(0.0), 0.0, 1.0)
    }

    fn axis(&self, i: usize) -> f64 {
        clamp(self.axes.get(i).copied().unwrap_or(0.0), -1.0, 1.0)
    }
}

/// Platform gamepad API
pub trait GamepadSource {
    /// Snapshots of all connected controllers
    fn snapshots(&mut self) -> Vec<GamepadSnapshot>;
}

/// Diffs successive snapshots from a [`GamepadSource`] into presses,
/// releases and analog changes.
///
/// Triggers are reported as analog `trigger` input, other buttons as digital
/// `button` input. A controller that disconnects has its held buttons
/// released and its sticks and triggers returned to zero.
pub struct GamepadAdapter<S: GamepadSource> {
    source: S,
    previous: BTreeMap<usize, GamepadSnapshot>,
}

impl<S: GamepadSource> GamepadAdapter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            previous: BTreeMap::new(),
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Slots seen connected at the last poll
    pub fn connected(&self) -> Vec<usize> {
        self.previous.keys().copied().collect()
    }

    fn diff(before: &GamepadSnapshot, after: &GamepadSnapshot, out: &mut Vec<NormalizedInput>) {
        for (i, name) in BUTTON_NAMES.iter().enumerate() {
            let (old, new) = (before.button(i), after.button(i));
            if TRIGGER_BUTTONS.contains(&i) {
                if analog_changed(old, new) {
                    out.push(NormalizedInput::analog(
                        DeviceType::Gamepad,
                        InputType::Trigger,
                        name,
                        new,
                    ));
                }
                continue;
            }

            let (was_down, is_down) = (old > BUTTON_THRESHOLD, new > BUTTON_THRESHOLD);
            if is_down && !was_down {
                out.push(NormalizedInput::press(DeviceType::Gamepad, InputType::Button, name));
            } else if was_down && !is_down {
                out.push(NormalizedInput::release(DeviceType::Gamepad, InputType::Button, name));
            }
        }

        for (i, name) in AXIS_NAMES.iter().enumerate() {
            let (old, new) = (before.axis(i), after.axis(i));
            if analog_changed(old, new) {
                out.push(NormalizedInput::analog(
                    DeviceType::Gamepad,
                    InputType::Stick,
                    name,
                    new,
                ));
            }
        }
    }
}

impl<S: GamepadSource> DeviceAdapter for GamepadAdapter<S> {
    fn device_type(&self) -> DeviceType {
        DeviceType::Gamepad
    }

    fn poll(&mut self, now: Duration) -> Vec<NormalizedInput> {
        let mut inputs = Vec::new();
        let mut current = BTreeMap::new();

        for snapshot in self.source.snapshots() {
            let before = self
                .previous
                .remove(&snapshot.index)
                .unwrap_or_else(|| {
                    debug!("Gamepad {} connected", snapshot.index);
                    GamepadSnapshot::new(snapshot.index)
                });
            Self::diff(&before, &snapshot, &mut inputs);
            current.insert(snapshot.index, snapshot);
        }

        // Whatever is left was not reported this time
        for (index, before) in std::mem::take(&mut self.previous) {
            debug!("Gamepad {} disconnected", index);
            Self::diff(&before, &GamepadSnapshot::new(index), &mut inputs);
        }

        self.previous = current;
        inputs.into_iter().map(|input| input.at(now)).collect()
    }
}
