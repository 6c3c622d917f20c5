// Per-action press/release/analog state

use std::collections::HashMap;
use std::time::Duration;

use super::binding::Action;
use super::events::InputEvent;
use super::keys::EventType;

/// Current state of a single action
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionState {
    pub is_pressed: bool,
    /// Set by a press, cleared by the next tick
    pub just_pressed: bool,
    /// Set by a release, cleared by the next tick
    pub just_released: bool,
    pub value: f64,
    /// Time of the last input that touched this action
    pub timestamp: Duration,
}

/// Tracks every action that has ever been resolved.
///
/// `just_pressed` / `just_released` become true when the transition is
/// processed and stay true until the following [`update_action_states`] tick,
/// which reports them as events and clears them.
///
/// [`update_action_states`]: ActionStateTracker::update_action_states
#[derive(Debug)]
pub struct ActionStateTracker {
    states: HashMap<String, ActionState>,

    /// Analog magnitude above which an action counts as pressed
    analog_deadzone: f64,
}

impl ActionStateTracker {
    pub fn new(analog_deadzone: f64) -> Self {
        Self {
            states: HashMap::new(),
            analog_deadzone,
        }
    }

    /// Apply a resolved action to its state
    pub fn process_action_input(&mut self, action: &Action) {
        let deadzone = self.analog_deadzone;
        let state = self.states.entry(action.name.clone()).or_default();
        let was_pressed = state.is_pressed;

        match action.event_type {
            EventType::Press | EventType::Repeat => {
                state.is_pressed = true;
                if !was_pressed {
                    state.just_pressed = true;
                }
                state.value = action.value;
            }
            EventType::Release => {
                state.is_pressed = false;
                if was_pressed {
                    state.just_released = true;
                }
                state.value = 0.0;
            }
            EventType::Analog => {
                state.value = action.value;
                state.is_pressed = action.value.abs() > deadzone;
                if state.is_pressed && !was_pressed {
                    state.just_pressed = true;
                }
                if !state.is_pressed && was_pressed {
                    state.just_released = true;
                }
            }
        }
        state.timestamp = action.timestamp;
    }

    /// End-of-tick pass: report transitions and held actions, then clear the
    /// single-tick flags.
    pub fn update_action_states(&mut self) -> Vec<InputEvent> {
        let mut names: Vec<&String> = self.states.keys().collect();
        names.sort();

        let mut events = Vec::new();
        for name in names {
            let state = &self.states[name];
            if state.just_pressed {
                events.push(InputEvent::ActionPressed {
                    action: name.clone(),
                    value: state.value,
                });
            } else if state.is_pressed {
                events.push(InputEvent::ActionHeld {
                    action: name.clone(),
                    value: state.value,
                });
            }
            if state.just_released {
                events.push(InputEvent::ActionReleased {
                    action: name.clone(),
                });
            }
        }

        for state in self.states.values_mut() {
            state.just_pressed = false;
            state.just_released = false;
        }
        events
    }

    pub fn is_pressed(&self, action: &str) -> bool {
        self.states.get(action).map_or(false, |s| s.is_pressed)
    }

    pub fn just_pressed(&self, action: &str) -> bool {
        self.states.get(action).map_or(false, |s| s.just_pressed)
    }

    pub fn just_released(&self, action: &str) -> bool {
        self.states.get(action).map_or(false, |s| s.just_released)
    }

    pub fn value(&self, action: &str) -> f64 {
        self.states.get(action).map_or(0.0, |s| s.value)
    }

    pub fn state(&self, action: &str) -> Option<ActionState> {
        self.states.get(action).copied()
    }

    /// Names of all currently pressed actions, sorted
    pub fn pressed_actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .states
            .iter()
            .filter(|(_, s)| s.is_pressed)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Release every pressed action, e.g. when the bindings that held them
    /// stop applying. Returns how many were released.
    pub fn release_all(&mut self, timestamp: Duration) -> usize {
        let mut released = 0;
        for state in self.states.values_mut().filter(|s| s.is_pressed) {
            state.is_pressed = false;
            state.just_released = true;
            state.value = 0.0;
            state.timestamp = timestamp;
            released += 1;
        }
        released
    }

    pub fn set_analog_deadzone(&mut self, deadzone: f64) {
        self.analog_deadzone = deadzone.max(0.0);
    }

    /// Forget all action state
    pub fn reset(&mut self) {
        self.states.clear();
    }
}

impl Default for ActionStateTracker {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::keys::{DeviceType, InputType};

    fn action(name: &str, event_type: EventType, value: f64) -> Action {
        Action {
            name: name.to_string(),
            event_type,
            value,
            device_type: DeviceType::Keyboard,
            input_type: InputType::Key,
            context: "default".to_string(),
            timestamp: Duration::ZERO,
        }
    }

    #[test]
    fn test_press_action() {
        let mut tracker = ActionStateTracker::default();
        tracker.process_action_input(&action("jump", EventType::Press, 1.0));
        assert!(tracker.is_pressed("jump"));
        assert!(tracker.just_pressed("jump"));
        assert_eq!(tracker.value("jump"), 1.0);
    }

    #[test]
    fn test_just_pressed_lasts_one_tick() {
        let mut tracker = ActionStateTracker::default();
        tracker.process_action_input(&action("jump", EventType::Press, 1.0));
        assert!(tracker.just_pressed("jump"));

        let events = tracker.update_action_states();
        assert_eq!(
            events,
            vec![InputEvent::ActionPressed {
                action: "jump".to_string(),
                value: 1.0
            }]
        );
        assert!(!tracker.just_pressed("jump"));
        assert!(tracker.is_pressed("jump"));

        // Next tick without new input: still held, no new press
        let events = tracker.update_action_states();
        assert_eq!(
            events,
            vec![InputEvent::ActionHeld {
                action: "jump".to_string(),
                value: 1.0
            }]
        );
    }

    #[test]
    fn test_release_action() {
        let mut tracker = ActionStateTracker::default();
        tracker.process_action_input(&action("jump", EventType::Press, 1.0));
        tracker.update_action_states();
        tracker.process_action_input(&action("jump", EventType::Release, 0.0));

        assert!(!tracker.is_pressed("jump"));
        assert!(tracker.just_released("jump"));
        let events = tracker.update_action_states();
        assert_eq!(
            events,
            vec![InputEvent::ActionReleased {
                action: "jump".to_string()
            }]
        );
        assert!(!tracker.just_released("jump"));
    }

    #[test]
    fn test_release_unpressed_action() {
        let mut tracker = ActionStateTracker::default();
        tracker.process_action_input(&action("jump", EventType::Release, 0.0));
        assert!(!tracker.just_released("jump"));
    }

    #[test]
    fn test_repeat_does_not_retrigger() {
        let mut tracker = ActionStateTracker::default();
        tracker.process_action_input(&action("type", EventType::Press, 1.0));
        tracker.update_action_states();
        tracker.process_action_input(&action("type", EventType::Repeat, 1.0));
        assert!(tracker.is_pressed("type"));
        assert!(!tracker.just_pressed("type"));
    }

    #[test]
    fn test_analog_edges() {
        let mut tracker = ActionStateTracker::new(0.2);
        tracker.process_action_input(&action("throttle", EventType::Analog, 0.1));
        assert!(!tracker.is_pressed("throttle"));
        assert!(!tracker.just_pressed("throttle"));

        tracker.process_action_input(&action("throttle", EventType::Analog, 0.6));
        assert!(tracker.is_pressed("throttle"));
        assert!(tracker.just_pressed("throttle"));
        tracker.update_action_states();

        tracker.process_action_input(&action("throttle", EventType::Analog, -0.7));
        assert!(tracker.is_pressed("throttle"));
        assert!(!tracker.just_pressed("throttle"));
        assert_eq!(tracker.value("throttle"), -0.7);

        tracker.process_action_input(&action("throttle", EventType::Analog, 0.0));
        assert!(tracker.just_released("throttle"));
    }

    #[test]
    fn test_unknown_action_defaults() {
        let tracker = ActionStateTracker::default();
        assert!(!tracker.is_pressed("nothing"));
        assert_eq!(tracker.value("nothing"), 0.0);
        assert!(tracker.state("nothing").is_none());
    }

    #[test]
    fn test_pressed_actions_and_reset() {
        let mut tracker = ActionStateTracker::default();
        tracker.process_action_input(&action("b", EventType::Press, 1.0));
        tracker.process_action_input(&action("a", EventType::Press, 1.0));
        assert_eq!(tracker.pressed_actions(), vec!["a", "b"]);

        tracker.reset();
        assert!(tracker.pressed_actions().is_empty());
    }

    #[test]
    fn test_release_all() {
        let mut tracker = ActionStateTracker::default();
        tracker.process_action_input(&action("run", EventType::Press, 1.0));
        tracker.process_action_input(&action("aim", EventType::Press, 1.0));
        tracker.update_action_states();

        assert_eq!(tracker.pressed_actions(), vec!["aim", "run"]);
        assert_eq!(tracker.release_all(Duration::from_millis(40)), 2);
        assert!(tracker.pressed_actions().is_empty());
        assert!(tracker.just_released("run"));
        assert_eq!(tracker.value("aim"), 0.0);
        assert_eq!(tracker.release_all(Duration::from_millis(50)), 0);
    }
}
