// Events published by the input pipeline and a small in-process event bus

use log::trace;
use std::collections::HashMap;

use super::combo::ComboEvent;
use super::config::InputConfig;

/// Everything the input manager reports to the rest of the game
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    ActionPressed { action: String, value: f64 },
    ActionReleased { action: String },
    ActionHeld { action: String, value: f64 },
    Combo(ComboEvent),
    ContextChanged { context: String, stack: Vec<String> },
    /// A reported, non-fatal failure; `context` names the operation
    Error { error: String, context: String },
    Initialized,
    Disposed,
    ConfigLoaded { config: InputConfig },
    ConfigSaved { config: InputConfig },
}

impl InputEvent {
    pub const ACTION_PRESSED: &'static str = "input:action_pressed";
    pub const ACTION_RELEASED: &'static str = "input:action_released";
    pub const ACTION_HELD: &'static str = "input:action_held";
    pub const COMBO: &'static str = "input:combo";
    pub const CONTEXT_CHANGED: &'static str = "input:context_changed";
    pub const ERROR: &'static str = "input:error";
    pub const INITIALIZED: &'static str = "input:initialized";
    pub const DISPOSED: &'static str = "input:disposed";
    pub const CONFIG_LOADED: &'static str = "input:config_loaded";
    pub const CONFIG_SAVED: &'static str = "input:config_saved";

    /// Event type name, e.g. `input:action_pressed`
    pub fn name(&self) -> &'static str {
        match self {
            InputEvent::ActionPressed { .. } => Self::ACTION_PRESSED,
            InputEvent::ActionReleased { .. } => Self::ACTION_RELEASED,
            InputEvent::ActionHeld { .. } => Self::ACTION_HELD,
            InputEvent::Combo(_) => Self::COMBO,
            InputEvent::ContextChanged { .. } => Self::CONTEXT_CHANGED,
            InputEvent::Error { .. } => Self::ERROR,
            InputEvent::Initialized => Self::INITIALIZED,
            InputEvent::Disposed => Self::DISPOSED,
            InputEvent::ConfigLoaded { .. } => Self::CONFIG_LOADED,
            InputEvent::ConfigSaved { .. } => Self::CONFIG_SAVED,
        }
    }

    pub fn error(error: impl ToString, context: &str) -> Self {
        InputEvent::Error {
            error: error.to_string(),
            context: context.to_string(),
        }
    }
}

type Listener = Box<dyn FnMut(&InputEvent)>;

/// Delivers events to listeners by name and queues them for polling.
///
/// Listeners run synchronously inside `emit`. Every emitted event is also
/// queued until drained, so callers that prefer polling once per frame can
/// ignore listeners entirely.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<&'static str, Vec<Listener>>,
    queue: Vec<InputEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events named `name` (see the `InputEvent` constants)
    pub fn on<F>(&mut self, name: &'static str, listener: F)
    where
        F: FnMut(&InputEvent) + 'static,
    {
        self.listeners.entry(name).or_default().push(Box::new(listener));
    }

    pub fn emit(&mut self, event: InputEvent) {
        trace!("emit {}", event.name());
        if let Some(listeners) = self.listeners.get_mut(event.name()) {
            for listener in listeners.iter_mut() {
                listener(&event);
            }
        }
        self.queue.push(event);
    }

    /// Take all queued events, oldest first
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.queue)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("queued", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_event_names() {
        assert_eq!(
            InputEvent::ActionPressed {
                action: "jump".into(),
                value: 1.0
            }
            .name(),
            "input:action_pressed"
        );
        assert_eq!(InputEvent::Initialized.name(), "input:initialized");
        assert_eq!(InputEvent::error("bad", "op").name(), "input:error");
    }

    #[test]
    fn test_listeners_receive_matching_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut bus = EventBus::new();
        bus.on(InputEvent::ACTION_RELEASED, move |event| {
            sink.borrow_mut().push(event.clone());
        });
        bus.emit(InputEvent::Initialized);
        bus.emit(InputEvent::ActionReleased {
            action: "jump".into(),
        });

        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_drain_returns_in_order() {
        let mut bus = EventBus::new();
        bus.emit(InputEvent::Initialized);
        bus.emit(InputEvent::Disposed);

        assert_eq!(bus.drain(), vec![InputEvent::Initialized, InputEvent::Disposed]);
        assert!(bus.drain().is_empty());
    }
}
