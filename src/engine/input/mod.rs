// Input handling system
//
// Turns raw device events into game actions and combos, independent of any
// windowing or rendering framework.
//
// ## Architecture
//
// - `keys`: Canonical input vocabulary and binding-string parsing
// - `binding`: Binding descriptors and resolved actions
// - `table`: Per-context binding table with a versioned lookup cache
// - `buffer`: Bounded set of held keys
// - `history`: Timestamped input history and sequence queries
// - `combo`: Combo detection state machine
// - `context`: Input context stack
// - `state`: Per-action press/release/analog state
// - `events`: Events published by the pipeline
// - `config`: Configuration model and persistence
// - `manager`: Input manager coordinating everything
//
// ## Usage Example
//
// ```rust
// use combo_input::engine::input::{InputEvent, InputManager, NormalizedInput};
//
// let mut input = InputManager::default();
// input.initialize()?;
// input.add_binding("default", "jump", "space");
//
// // In your event loop, feed normalized device input
// input.process_raw_input("keyboard", NormalizedInput::key_press("space"));
//
// // Once per frame
// input.update(frame_time);
// for event in input.drain_events() {
//     if let InputEvent::ActionPressed { action, .. } = event {
//         // "jump" was just pressed
//     }
// }
// ```

pub mod binding;
pub mod buffer;
pub mod combo;
pub mod config;
pub mod context;
pub mod events;
pub mod history;
pub mod keys;
pub mod manager;
pub mod state;
pub mod table;

// Re-export commonly used types
pub use binding::{Action, BindingConditions, BindingDescriptor};
pub use buffer::{Capacity, PressedKeys};
pub use combo::{ComboDefinition, ComboEvent, ComboMatcher, ComboStep};
pub use config::{
    BindingEntry, BindingSpec, BindingsConfig, ConfigStore, InputConfig, InputSettings,
    JsonFileStore, MemoryStore,
};
pub use context::ContextStack;
pub use events::{EventBus, InputEvent};
pub use history::{HistoryFilter, InputHistory, InputPattern, PatternMatch};
pub use keys::{DeviceType, EventType, InputType, Modifiers, NormalizedInput};
pub use manager::InputManager;
pub use state::{ActionState, ActionStateTracker};
pub use table::BindingTable;

/// Input pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Input manager is already initialized")]
    AlreadyInitialized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown device type: {0}")]
    UnknownDevice(String),

    #[error("No configuration store attached")]
    NoStore,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Combo callback failed: {0}")]
    Callback(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = InputError::UnknownDevice("toaster".to_string());
        assert_eq!(err.to_string(), "Unknown device type: toaster");
        assert_eq!(
            InputError::AlreadyInitialized.to_string(),
            "Input manager is already initialized"
        );
    }
}
