// Combo input: context-scoped action bindings, input history and combo
// detection for games

pub mod core;
pub mod engine;

pub use engine::devices::{DeviceAdapter, GamepadAdapter, KeyboardAdapter, MouseAdapter};
pub use engine::input::{
    ComboDefinition, ComboEvent, DeviceType, EventType, InputConfig, InputError, InputEvent,
    InputManager, InputSettings, InputType, Modifiers, NormalizedInput,
};
