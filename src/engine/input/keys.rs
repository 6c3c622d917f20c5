// Canonical input vocabulary and binding-string parsing
//
// Everything here is pure: device events and human-written binding strings are
// turned into the same canonical names so the binding table and the combo
// matcher can compare them directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::binding::BindingDescriptor;
use super::InputError;

/// Physical device family an input came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Keyboard,
    Mouse,
    Gamepad,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Keyboard => "keyboard",
            DeviceType::Mouse => "mouse",
            DeviceType::Gamepad => "gamepad",
        }
    }

    /// Input type assumed for a binding string that names no analog control
    pub fn default_input_type(&self) -> InputType {
        match self {
            DeviceType::Keyboard => InputType::Key,
            DeviceType::Mouse | DeviceType::Gamepad => InputType::Button,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyboard" | "key" => Ok(DeviceType::Keyboard),
            "mouse" => Ok(DeviceType::Mouse),
            "gamepad" | "controller" => Ok(DeviceType::Gamepad),
            other => Err(InputError::UnknownDevice(other.to_string())),
        }
    }
}

/// Kind of control on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Key,
    Button,
    Movement,
    Wheel,
    Stick,
    Trigger,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Key => "key",
            InputType::Button => "button",
            InputType::Movement => "movement",
            InputType::Wheel => "wheel",
            InputType::Stick => "stick",
            InputType::Trigger => "trigger",
        }
    }

    /// Whether the control reports continuous values
    pub fn is_analog(&self) -> bool {
        matches!(
            self,
            InputType::Movement | InputType::Wheel | InputType::Stick | InputType::Trigger
        )
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Press,
    Release,
    Repeat,
    Analog,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Press => "press",
            EventType::Release => "release",
            EventType::Repeat => "repeat",
            EventType::Analog => "analog",
        }
    }
}

/// Modifier keys held while an input happened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt || self.meta)
    }

    /// Whether every modifier set in `self` is also set in `other`
    pub fn is_subset_of(&self, other: &Modifiers) -> bool {
        (!self.shift || other.shift)
            && (!self.ctrl || other.ctrl)
            && (!self.alt || other.alt)
            && (!self.meta || other.meta)
    }

    /// Active modifier names in alphabetical order
    pub fn active_names(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(4);
        if self.alt {
            names.push("alt");
        }
        if self.ctrl {
            names.push("ctrl");
        }
        if self.meta {
            names.push("meta");
        }
        if self.shift {
            names.push("shift");
        }
        names
    }

    /// Set the flag named by `token`, returning false if it is not a modifier
    fn set_from_token(&mut self, token: &str) -> bool {
        match token {
            "ctrl" | "control" => self.ctrl = true,
            "shift" => self.shift = true,
            "alt" | "option" => self.alt = true,
            "meta" | "cmd" | "command" | "super" => self.meta = true,
            _ => return false,
        }
        true
    }
}

/// A single device event in canonical, device-agnostic form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedInput {
    pub device_type: DeviceType,
    pub input_type: InputType,
    pub key: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub value: f64,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Monotonic capture time
    #[serde(default)]
    pub timestamp: Duration,
}

impl NormalizedInput {
    /// Digital press, value 1
    pub fn press(device_type: DeviceType, input_type: InputType, key: &str) -> Self {
        Self::digital(device_type, input_type, key, EventType::Press)
    }

    /// Digital release, value 0
    pub fn release(device_type: DeviceType, input_type: InputType, key: &str) -> Self {
        Self::digital(device_type, input_type, key, EventType::Release)
    }

    /// Keyboard key press
    pub fn key_press(key: &str) -> Self {
        Self::press(DeviceType::Keyboard, InputType::Key, key)
    }

    /// Keyboard key release
    pub fn key_release(key: &str) -> Self {
        Self::release(DeviceType::Keyboard, InputType::Key, key)
    }

    /// Continuous reading from a stick, trigger, wheel or pointer
    pub fn analog(device_type: DeviceType, input_type: InputType, key: &str, value: f64) -> Self {
        Self {
            device_type,
            input_type,
            key: normalize_key(device_type, key),
            event_type: EventType::Analog,
            value,
            modifiers: Modifiers::NONE,
            timestamp: Duration::ZERO,
        }
    }

    fn digital(
        device_type: DeviceType,
        input_type: InputType,
        key: &str,
        event_type: EventType,
    ) -> Self {
        let value = match event_type {
            EventType::Release => 0.0,
            _ => 1.0,
        };
        Self {
            device_type,
            input_type,
            key: normalize_key(device_type, key),
            event_type,
            value,
            modifiers: Modifiers::NONE,
            timestamp: Duration::ZERO,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn at_millis(self, millis: u64) -> Self {
        self.at(Duration::from_millis(millis))
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }
}

/// Trimmed, lower-cased spelling shared by every device
pub fn fold_key(raw: &str) -> String {
    if raw == " " {
        return "space".to_string();
    }
    raw.trim().to_lowercase()
}

/// Canonical spelling of a key or control name on `device_type`.
///
/// Every device gets the folded spelling. Keyboard keys additionally fold
/// common aliases onto one name, so `"Esc"` and `"escape"` are the same key
/// while a mouse `"left"` button stays `"left"`.
pub fn normalize_key(device_type: DeviceType, raw: &str) -> String {
    let folded = fold_key(raw);
    if device_type != DeviceType::Keyboard {
        return folded;
    }
    let canonical = match folded.as_str() {
        "esc" => "escape",
        "spacebar" | "space bar" => "space",
        "return" => "enter",
        "del" => "delete",
        "ins" => "insert",
        "up" => "arrowup",
        "down" => "arrowdown",
        "left" => "arrowleft",
        "right" => "arrowright",
        "control" => "ctrl",
        "cmd" | "command" => "meta",
        "pgup" => "pageup",
        "pgdn" => "pagedown",
        _ => return folded,
    };
    canonical.to_string()
}

/// Analog input type implied by a well-known control name, if any
pub fn analog_input_type(device_type: DeviceType, key: &str) -> Option<InputType> {
    match (device_type, key) {
        (DeviceType::Gamepad, "leftstickx" | "leftsticky" | "rightstickx" | "rightsticky") => {
            Some(InputType::Stick)
        }
        (DeviceType::Gamepad, "left_trigger" | "right_trigger") => Some(InputType::Trigger),
        (DeviceType::Mouse, "wheel" | "wheelx" | "wheely") => Some(InputType::Wheel),
        (DeviceType::Mouse, "movex" | "movey") => Some(InputType::Movement),
        _ => None,
    }
}

/// Parse a human-readable binding such as `"ctrl+shift+c"` or
/// `"gamepad:button_a"` into a descriptor.
///
/// Parsing is lenient: an unknown device prefix falls back to the keyboard and
/// any token that is not a modifier becomes the key, the last one winning.
pub fn parse_binding_string(s: &str) -> BindingDescriptor {
    let (device_type, rest) = match s.split_once(':') {
        Some((prefix, rest)) => (prefix.parse().unwrap_or(DeviceType::Keyboard), rest),
        None => (DeviceType::Keyboard, s),
    };

    let mut modifiers = Modifiers::NONE;
    let mut key = String::new();
    for token in rest.split('+') {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            continue;
        }
        if !modifiers.set_from_token(&token) {
            key = normalize_key(device_type, &token);
        }
    }

    // "shift" alone names the key itself, not a modifier on nothing
    if key.is_empty() {
        if let Some(last) = modifiers.active_names().pop() {
            key = last.to_string();
            modifiers = Modifiers::NONE;
        }
    }

    let input_type = analog_input_type(device_type, &key)
        .unwrap_or_else(|| device_type.default_input_type());

    BindingDescriptor::new(device_type, input_type, &key).with_modifiers(modifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_key_defaults_to_keyboard() {
        let descriptor = parse_binding_string("W");
        assert_eq!(descriptor.device_type, DeviceType::Keyboard);
        assert_eq!(descriptor.input_type, InputType::Key);
        assert_eq!(descriptor.key, "w");
        assert!(descriptor.modifiers.is_empty());
    }

    #[test]
    fn test_parse_modifiers() {
        let descriptor = parse_binding_string("ctrl+shift+c");
        assert_eq!(descriptor.key, "c");
        assert!(descriptor.modifiers.ctrl);
        assert!(descriptor.modifiers.shift);
        assert!(!descriptor.modifiers.alt);
        assert!(!descriptor.modifiers.meta);
    }

    #[test]
    fn test_parse_cmd_aliases_to_meta() {
        let descriptor = parse_binding_string("cmd+s");
        assert!(descriptor.modifiers.meta);
        assert_eq!(descriptor.key, "s");
    }

    #[test]
    fn test_parse_device_prefix() {
        let descriptor = parse_binding_string("gamepad:button_a");
        assert_eq!(descriptor.device_type, DeviceType::Gamepad);
        assert_eq!(descriptor.input_type, InputType::Button);
        assert_eq!(descriptor.key, "button_a");

        let descriptor = parse_binding_string("mouse:left");
        assert_eq!(descriptor.device_type, DeviceType::Mouse);
        assert_eq!(descriptor.input_type, InputType::Button);
    }

    #[test]
    fn test_parse_analog_names_pick_analog_type() {
        assert_eq!(
            parse_binding_string("gamepad:LeftStickX").input_type,
            InputType::Stick
        );
        assert_eq!(
            parse_binding_string("gamepad:right_trigger").input_type,
            InputType::Trigger
        );
        assert_eq!(parse_binding_string("mouse:wheel").input_type, InputType::Wheel);
    }

    #[test]
    fn test_parse_is_lenient() {
        // Last non-modifier token wins
        let descriptor = parse_binding_string("a+b");
        assert_eq!(descriptor.key, "b");

        // Unknown prefix falls back to keyboard
        let descriptor = parse_binding_string("joystick:x");
        assert_eq!(descriptor.device_type, DeviceType::Keyboard);
        assert_eq!(descriptor.key, "x");
    }

    #[test]
    fn test_parse_lone_modifier_is_key() {
        let descriptor = parse_binding_string("shift");
        assert_eq!(descriptor.key, "shift");
        assert!(descriptor.modifiers.is_empty());
    }

    #[test]
    fn test_normalize_key_aliases() {
        let keyboard = DeviceType::Keyboard;
        assert_eq!(normalize_key(keyboard, "Esc"), "escape");
        assert_eq!(normalize_key(keyboard, " "), "space");
        assert_eq!(normalize_key(keyboard, "Up"), "arrowup");
        assert_eq!(normalize_key(keyboard, "ArrowUp"), "arrowup");
        assert_eq!(normalize_key(keyboard, "F5"), "f5");
    }

    #[test]
    fn test_normalize_key_aliases_only_keyboard() {
        assert_eq!(normalize_key(DeviceType::Mouse, "Left"), "left");
        assert_eq!(normalize_key(DeviceType::Mouse, "right"), "right");
        assert_eq!(normalize_key(DeviceType::Gamepad, "LeftStickX"), "leftstickx");
    }

    #[test]
    fn test_parse_mouse_button_keeps_name() {
        let descriptor = parse_binding_string("mouse:left");
        assert_eq!(descriptor.device_type, DeviceType::Mouse);
        assert_eq!(descriptor.key, "left");
        assert_eq!(parse_binding_string("left").key, "arrowleft");

        let click = NormalizedInput::press(DeviceType::Mouse, InputType::Button, "Left");
        assert_eq!(click.key, "left");
    }

    #[test]
    fn test_modifier_names_sorted() {
        let mods = Modifiers {
            shift: true,
            ctrl: true,
            alt: false,
            meta: true,
        };
        assert_eq!(mods.active_names(), vec!["ctrl", "meta", "shift"]);
    }

    #[test]
    fn test_modifier_subset() {
        let ctrl = Modifiers::ctrl();
        let ctrl_shift = Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::NONE
        };
        assert!(ctrl.is_subset_of(&ctrl_shift));
        assert!(!ctrl_shift.is_subset_of(&ctrl));
        assert!(Modifiers::NONE.is_subset_of(&ctrl));
    }

    #[test]
    fn test_device_type_from_str() {
        assert_eq!("Gamepad".parse::<DeviceType>().unwrap(), DeviceType::Gamepad);
        assert!("wheelchair".parse::<DeviceType>().is_err());
    }

    #[test]
    fn test_digital_constructors_set_values() {
        assert_eq!(NormalizedInput::key_press("w").value, 1.0);
        assert_eq!(NormalizedInput::key_release("w").value, 0.0);
        assert_eq!(NormalizedInput::key_press("W").key, "w");
    }
}
