// Binding descriptors and the actions they resolve to

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::keys::{normalize_key, DeviceType, EventType, InputType, Modifiers, NormalizedInput};
use crate::core::analog::scale_and_deadzone;

pub const DEFAULT_SENSITIVITY: f64 = 1.0;
pub const DEFAULT_DEADZONE: f64 = 0.1;

/// Extra constraints a binding can place on the input value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BindingConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
}

impl BindingConditions {
    pub fn is_empty(&self) -> bool {
        self.min_value.is_none() && self.max_value.is_none() && self.input_type.is_none()
    }

    fn accepts(&self, input: &NormalizedInput) -> bool {
        if let Some(min) = self.min_value {
            if input.value < min {
                return false;
            }
        }
        if let Some(max) = self.max_value {
            if input.value > max {
                return false;
            }
        }
        if let Some(required) = self.input_type {
            if input.input_type != required {
                return false;
            }
        }
        true
    }
}

/// Canonical description of a physical input a binding listens to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingDescriptor {
    pub device_type: DeviceType,
    pub input_type: InputType,
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<BindingConditions>,
}

fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY
}

fn default_deadzone() -> f64 {
    DEFAULT_DEADZONE
}

impl BindingDescriptor {
    pub fn new(device_type: DeviceType, input_type: InputType, key: &str) -> Self {
        Self {
            device_type,
            input_type,
            key: normalize_key(device_type, key),
            modifiers: Modifiers::NONE,
            sensitivity: DEFAULT_SENSITIVITY,
            deadzone: DEFAULT_DEADZONE,
            conditions: None,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity.max(0.0);
        self
    }

    pub fn with_deadzone(mut self, deadzone: f64) -> Self {
        self.deadzone = deadzone.max(0.0);
        self
    }

    pub fn with_conditions(mut self, conditions: BindingConditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Lookup key: `device:inputType:key[:alt+ctrl+meta+shift]`
    pub fn binding_key(&self) -> String {
        binding_key(self.device_type, self.input_type, &self.key, &self.modifiers)
    }

    /// Whether sensitivity, deadzone and conditions are all at their defaults
    pub fn has_default_tuning(&self) -> bool {
        self.sensitivity == DEFAULT_SENSITIVITY
            && self.deadzone == DEFAULT_DEADZONE
            && self.conditions.as_ref().map_or(true, BindingConditions::is_empty)
    }

    /// Render back into the `ctrl+shift+c` / `gamepad:button_a` form
    pub fn to_binding_string(&self) -> String {
        let mut parts: Vec<&str> = self.modifiers.active_names();
        parts.push(&self.key);
        let joined = parts.join("+");
        match self.device_type {
            DeviceType::Keyboard => joined,
            device => format!("{}:{}", device, joined),
        }
    }
}

/// Build the binding-table key for a control plus modifiers
pub fn binding_key(
    device_type: DeviceType,
    input_type: InputType,
    key: &str,
    modifiers: &Modifiers,
) -> String {
    let base = format!("{}:{}:{}", device_type, input_type, key);
    if modifiers.is_empty() {
        base
    } else {
        format!("{}:{}", base, modifiers.active_names().join("+"))
    }
}

/// A descriptor bound to a named action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBinding {
    pub action: String,
    pub descriptor: BindingDescriptor,
}

impl ActionBinding {
    pub fn new(action: &str, descriptor: BindingDescriptor) -> Self {
        Self {
            action: action.to_string(),
            descriptor,
        }
    }
}

/// Full match check between a binding and an input.
///
/// Every modifier the binding requires must be held; modifiers the binding
/// does not mention are ignored.
pub fn matches_binding(descriptor: &BindingDescriptor, input: &NormalizedInput) -> bool {
    descriptor.device_type == input.device_type
        && descriptor.input_type == input.input_type
        && descriptor.key == input.key
        && descriptor.modifiers.is_subset_of(&input.modifiers)
        && descriptor
            .conditions
            .as_ref()
            .map_or(true, |conditions| conditions.accepts(input))
}

/// An action resolved from an input in some context
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub event_type: EventType,
    pub value: f64,
    pub device_type: DeviceType,
    pub input_type: InputType,
    pub context: String,
    pub timestamp: Duration,
}

impl Action {
    /// Materialize the action a binding produces for `input`
    pub fn from_binding(binding: &ActionBinding, input: &NormalizedInput, context: &str) -> Self {
        let descriptor = &binding.descriptor;
        Self {
            name: binding.action.clone(),
            event_type: input.event_type,
            value: scale_and_deadzone(input.value, descriptor.sensitivity, descriptor.deadzone),
            device_type: input.device_type,
            input_type: input.input_type,
            context: context.to_string(),
            timestamp: input.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::keys::parse_binding_string;

    #[test]
    fn test_binding_key_without_modifiers() {
        let descriptor = parse_binding_string("w");
        assert_eq!(descriptor.binding_key(), "keyboard:key:w");
    }

    #[test]
    fn test_binding_key_sorts_modifiers() {
        let a = parse_binding_string("shift+ctrl+c");
        let b = parse_binding_string("ctrl+shift+c");
        assert_eq!(a.binding_key(), "keyboard:key:c:ctrl+shift");
        assert_eq!(a.binding_key(), b.binding_key());
    }

    #[test]
    fn test_matches_requires_listed_modifiers() {
        let descriptor = parse_binding_string("ctrl+s");
        let plain = NormalizedInput::key_press("s");
        let with_ctrl = NormalizedInput::key_press("s").with_modifiers(Modifiers::ctrl());

        assert!(!matches_binding(&descriptor, &plain));
        assert!(matches_binding(&descriptor, &with_ctrl));
    }

    #[test]
    fn test_matches_checks_conditions() {
        let descriptor = BindingDescriptor::new(DeviceType::Gamepad, InputType::Stick, "leftstickx")
            .with_conditions(BindingConditions {
                min_value: Some(0.0),
                ..Default::default()
            });
        let right =
            NormalizedInput::analog(DeviceType::Gamepad, InputType::Stick, "leftstickx", 0.7);
        let left =
            NormalizedInput::analog(DeviceType::Gamepad, InputType::Stick, "leftstickx", -0.7);

        assert!(matches_binding(&descriptor, &right));
        assert!(!matches_binding(&descriptor, &left));
    }

    #[test]
    fn test_action_applies_sensitivity_then_deadzone() {
        let binding = ActionBinding::new(
            "look",
            BindingDescriptor::new(DeviceType::Gamepad, InputType::Stick, "rightstickx")
                .with_sensitivity(2.0)
                .with_deadzone(0.2),
        );
        let small =
            NormalizedInput::analog(DeviceType::Gamepad, InputType::Stick, "rightstickx", 0.05);
        let large =
            NormalizedInput::analog(DeviceType::Gamepad, InputType::Stick, "rightstickx", 0.4);

        assert_eq!(Action::from_binding(&binding, &small, "default").value, 0.0);
        assert_eq!(Action::from_binding(&binding, &large, "default").value, 0.8);
    }

    #[test]
    fn test_to_binding_string() {
        assert_eq!(parse_binding_string("shift+ctrl+c").to_binding_string(), "ctrl+shift+c");
        assert_eq!(
            parse_binding_string("gamepad:button_a").to_binding_string(),
            "gamepad:button_a"
        );
    }

    #[test]
    fn test_default_tuning() {
        assert!(parse_binding_string("w").has_default_tuning());
        assert!(!parse_binding_string("w").with_sensitivity(0.5).has_default_tuning());
    }
}
