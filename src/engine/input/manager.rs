// Input manager - Main coordination system for all input

use log::{debug, error, info, warn};
use std::time::Duration;

use super::binding::Action;
use super::buffer::{Capacity, PressedKeys};
use super::combo::{ComboDefinition, ComboMatcher};
use super::config::{BindingEntry, BindingsConfig, ConfigStore, InputConfig, InputSettings};
use super::context::ContextStack;
use super::events::{EventBus, InputEvent};
use super::history::{HistoryFilter, InputHistory, InputHistoryEntry, InputPattern, PatternMatch};
use super::keys::{normalize_key, parse_binding_string, DeviceType, EventType, NormalizedInput};
use super::state::{ActionState, ActionStateTracker};
use super::table::BindingTable;
use super::InputError;
use crate::engine::devices::DeviceAdapter;

/// Name under which a held key is tracked. Keyboard keys keep their bare
/// name; other devices are qualified, e.g. `mouse:left`.
fn held_key_name(device_type: DeviceType, key: &str) -> String {
    match device_type {
        DeviceType::Keyboard => key.to_string(),
        _ => format!("{}:{}", device_type, key),
    }
}

/// Lifecycle of an [`InputManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
}

/// Owns the whole input pipeline.
///
/// Raw device input goes through [`process_raw_input`]: it is recorded in the
/// history, offered to the combo matcher, and, unless it completed a combo,
/// resolved into actions through the bindings of the current context. Call
/// [`update`] once per frame to poll registered devices and publish action
/// transitions.
///
/// The manager is single-threaded and not reentrant: do not call `update` or
/// `process_raw_input` from inside an event listener or combo callback.
///
/// [`process_raw_input`]: InputManager::process_raw_input
/// [`update`]: InputManager::update
pub struct InputManager {
    settings: InputSettings,
    bindings: BindingTable,
    contexts: ContextStack,
    history: InputHistory,
    pressed: PressedKeys,
    combos: ComboMatcher,
    actions: ActionStateTracker,
    events: EventBus,

    /// Persistence backend for load/save
    store: Option<Box<dyn ConfigStore>>,

    /// Polled devices such as gamepads
    devices: Vec<Box<dyn DeviceAdapter>>,

    lifecycle: Lifecycle,
    paused: bool,

    /// Monotonic time: advanced by `update` and by newer input timestamps
    clock: Duration,
}

impl InputManager {
    /// Create an input manager with the given settings
    pub fn new(settings: InputSettings) -> Self {
        let default_context = settings.default_context.clone();
        Self {
            bindings: BindingTable::new(&default_context),
            contexts: ContextStack::new(&default_context),
            history: InputHistory::new(Capacity::from_setting(settings.buffer_size)),
            pressed: PressedKeys::new(Capacity::from_setting(settings.pressed_capacity)),
            combos: ComboMatcher::new(),
            actions: ActionStateTracker::new(settings.analog_deadzone),
            events: EventBus::new(),
            store: None,
            devices: Vec::new(),
            lifecycle: Lifecycle::Uninitialized,
            paused: false,
            clock: Duration::ZERO,
            settings,
        }
    }

    /// Attach a configuration store
    pub fn with_store(mut self, store: impl ConfigStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn set_store(&mut self, store: Box<dyn ConfigStore>) {
        self.store = Some(store);
    }

    /// Register a device polled during `update`
    pub fn add_device(&mut self, device: Box<dyn DeviceAdapter>) {
        debug!("Registered {} device", device.device_type());
        self.devices.push(device);
    }

    /// Enter the ready state with the default context active.
    ///
    /// Initializing twice is a programming error and is rejected.
    pub fn initialize(&mut self) -> Result<(), InputError> {
        if self.lifecycle == Lifecycle::Ready {
            error!("Input manager initialized twice");
            return Err(InputError::AlreadyInitialized);
        }

        let default_context = self.settings.default_context.clone();
        self.contexts.reset(&default_context);
        self.bindings.set_active_context(&default_context);
        self.lifecycle = Lifecycle::Ready;
        self.paused = false;

        info!("Input manager ready in context '{}'", default_context);
        self.events.emit(InputEvent::Initialized);
        Ok(())
    }

    /// Drop all runtime input state and return to the uninitialized state.
    /// Bindings, combos and devices stay registered.
    pub fn dispose(&mut self) {
        self.reset();
        self.contexts.reset(&self.settings.default_context);
        self.bindings.set_active_context(&self.settings.default_context);
        self.lifecycle = Lifecycle::Uninitialized;
        self.paused = false;

        info!("Input manager disposed");
        self.events.emit(InputEvent::Disposed);
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Stop `update` from doing anything until resumed
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current manager time
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Feed one normalized input from a device adapter.
    ///
    /// Invalid input is reported as an `input:error` event and rejected;
    /// this never panics or returns an error. Returns whether the input was
    /// accepted.
    pub fn process_raw_input(&mut self, device_type: &str, mut input: NormalizedInput) -> bool {
        if let Err(err) = Self::validate(device_type, &input) {
            self.report(err, "process_raw_input");
            return false;
        }
        input.key = normalize_key(input.device_type, &input.key);

        if input.timestamp.is_zero() {
            input.timestamp = self.clock;
        } else if input.timestamp > self.clock {
            self.clock = input.timestamp;
        }

        self.history.add_input(&input, self.clock);
        match input.event_type {
            EventType::Press => self.pressed.add(&held_key_name(input.device_type, &input.key)),
            EventType::Release => {
                self.pressed
                    .remove(&held_key_name(input.device_type, &input.key));
            }
            EventType::Repeat | EventType::Analog => {}
        }

        // A completed combo consumes the input
        if let Some(combo) = self.combos.process_input(&input) {
            info!("Combo '{}' triggered", combo.combo_id);
            self.events.emit(InputEvent::Combo(combo.clone()));
            if let Err(err) = self.combos.run_callback(&combo) {
                self.report(err, "combo_callback");
            }
            return true;
        }

        let context = self.contexts.current().to_string();
        let actions = self.bindings.map_input_to_actions(&input, Some(&context));
        for action in &actions {
            self.actions.process_action_input(action);
        }
        true
    }

    fn validate(device_type: &str, input: &NormalizedInput) -> Result<(), InputError> {
        let device: DeviceType = device_type.parse()?;
        if device != input.device_type {
            return Err(InputError::InvalidInput(format!(
                "{} input delivered as {}",
                input.device_type, device
            )));
        }
        if input.key.trim().is_empty() {
            return Err(InputError::InvalidInput("input has no key".to_string()));
        }
        if !input.value.is_finite() {
            return Err(InputError::InvalidInput(format!(
                "non-finite value for '{}'",
                input.key
            )));
        }
        Ok(())
    }

    /// Advance one frame: poll devices, expire stale combos, then publish
    /// action transitions. Does nothing while uninitialized or paused.
    pub fn update(&mut self, delta: Duration) {
        if self.lifecycle != Lifecycle::Ready || self.paused {
            return;
        }
        self.clock += delta;

        let now = self.clock;
        let polled: Vec<NormalizedInput> = self
            .devices
            .iter_mut()
            .flat_map(|device| device.poll(now))
            .collect();
        for input in polled {
            let device = input.device_type.as_str();
            self.process_raw_input(device, input);
        }

        self.combos.prune_expired(self.clock);
        if self.settings.history_max_age_ms > 0 {
            let max_age = Duration::from_millis(self.settings.history_max_age_ms);
            self.history.prune_older_than(max_age, self.clock);
        }
        self.update_action_states();
    }

    /// Publish pressed/held/released events and clear single-tick flags
    pub fn update_action_states(&mut self) {
        for event in self.actions.update_action_states() {
            self.events.emit(event);
        }
    }

    // --- contexts ---

    /// Make `name` the active context. Actions held under the previous
    /// context are released and report `action:released` on the next tick.
    pub fn push_context(&mut self, name: &str) {
        self.actions.release_all(self.clock);
        self.contexts.push(name);
        self.bindings.set_active_context(name);
        debug!("Pushed input context '{}'", name);
        self.emit_context_changed();
    }

    /// Return to the previous context; a no-op when nothing was pushed
    pub fn pop_context(&mut self) -> bool {
        let Some(previous) = self.contexts.pop().map(str::to_string) else {
            return false;
        };
        self.actions.release_all(self.clock);
        self.bindings.set_active_context(&previous);
        debug!("Popped back to input context '{}'", previous);
        self.emit_context_changed();
        true
    }

    fn emit_context_changed(&mut self) {
        self.events.emit(InputEvent::ContextChanged {
            context: self.contexts.current().to_string(),
            stack: self.contexts.saved().to_vec(),
        });
    }

    pub fn current_context(&self) -> &str {
        self.contexts.current()
    }

    pub fn context_stack(&self) -> &ContextStack {
        &self.contexts
    }

    // --- bindings ---

    pub fn add_binding(&mut self, context: &str, action: &str, binding: impl Into<BindingEntry>) {
        self.bindings.add_binding(context, action, binding);
    }

    pub fn remove_binding(
        &mut self,
        context: &str,
        action: &str,
        binding: Option<BindingEntry>,
    ) -> usize {
        self.bindings.remove_binding(context, action, binding)
    }

    pub fn load_bindings(&mut self, bindings: &BindingsConfig) {
        self.bindings.load_bindings(bindings);
    }

    /// Resolve an input without touching any state besides the lookup cache
    pub fn map_input_to_actions(
        &mut self,
        input: &NormalizedInput,
        context: Option<&str>,
    ) -> Vec<Action> {
        self.bindings.map_input_to_actions(input, context)
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    // --- combos ---

    pub fn register_combo(&mut self, combo: ComboDefinition) {
        debug!("Registered combo '{}'", combo.id);
        self.combos.register(combo);
    }

    /// Register a combo made of key presses. A malformed definition is
    /// reported as an `input:error` event and `false` is returned.
    pub fn register_key_combo(
        &mut self,
        id: &str,
        keys: &[&str],
        timeout: Option<Duration>,
    ) -> bool {
        let timeout =
            timeout.unwrap_or_else(|| Duration::from_millis(self.settings.combo_timeout_ms));
        match ComboDefinition::from_keys(id, keys, timeout) {
            Ok(combo) => {
                self.register_combo(combo);
                true
            }
            Err(err) => {
                self.report(err, "register_combo");
                false
            }
        }
    }

    pub fn unregister_combo(&mut self, id: &str) -> bool {
        self.combos.unregister(id)
    }

    pub fn combos(&self) -> &ComboMatcher {
        &self.combos
    }

    // --- configuration ---

    /// Apply `config`, or load one from the store when `None`.
    ///
    /// Store failures are retried up to `max_load_attempts` times with one
    /// `input:error` per failure; if every attempt fails the bindings are
    /// replaced with an empty set. Returns whether a configuration was applied.
    pub fn load_config(&mut self, config: Option<InputConfig>) -> bool {
        let config = match config {
            Some(config) => Some(config),
            None => self.load_from_store(),
        };

        match config {
            Some(config) => {
                self.apply_config(&config);
                info!(
                    "Input config loaded: {} bindings in {} contexts",
                    self.bindings.binding_count(),
                    self.bindings.contexts().len()
                );
                self.events.emit(InputEvent::ConfigLoaded { config });
                true
            }
            None => {
                warn!("No input config could be loaded, falling back to empty bindings");
                self.bindings.load_bindings(&BindingsConfig::new());
                false
            }
        }
    }

    fn load_from_store(&mut self) -> Option<InputConfig> {
        let Some(store) = self.store.as_mut() else {
            self.report(InputError::NoStore, "load_config");
            return None;
        };

        let attempts = self.settings.max_load_attempts.max(1);
        for attempt in 1..=attempts {
            match store.load() {
                Ok(config) => return Some(config),
                Err(err) => {
                    warn!("Config load attempt {}/{} failed: {}", attempt, attempts, err);
                    self.events.emit(InputEvent::error(&err, "load_config"));
                }
            }
        }
        None
    }

    fn apply_config(&mut self, config: &InputConfig) {
        self.settings = config.settings.clone();
        self.history
            .set_capacity(Capacity::from_setting(self.settings.buffer_size));
        self.pressed
            .set_capacity(Capacity::from_setting(self.settings.pressed_capacity));
        self.actions
            .set_analog_deadzone(self.settings.analog_deadzone);
        self.bindings.load_bindings(&config.bindings);
    }

    /// Current bindings and settings in configuration form
    pub fn current_config(&self) -> InputConfig {
        InputConfig {
            bindings: self.bindings.to_config(),
            settings: self.settings.clone(),
        }
    }

    /// Persist the current configuration. Failures are reported as an
    /// `input:error` event, not retried. Returns whether it was saved.
    pub fn save_config(&mut self) -> bool {
        let config = self.current_config();
        let Some(store) = self.store.as_mut() else {
            self.report(InputError::NoStore, "save_config");
            return false;
        };

        match store.save(&config) {
            Ok(()) => {
                self.events.emit(InputEvent::ConfigSaved { config });
                true
            }
            Err(err) => {
                self.report(err, "save_config");
                false
            }
        }
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    // --- queries ---

    pub fn is_action_pressed(&self, action: &str) -> bool {
        self.actions.is_pressed(action)
    }

    pub fn is_action_just_pressed(&self, action: &str) -> bool {
        self.actions.just_pressed(action)
    }

    pub fn is_action_just_released(&self, action: &str) -> bool {
        self.actions.just_released(action)
    }

    pub fn action_value(&self, action: &str) -> f64 {
        self.actions.value(action)
    }

    pub fn action_state(&self, action: &str) -> Option<ActionState> {
        self.actions.state(action)
    }

    /// Whether a key is held. Plain names refer to the keyboard; other
    /// devices are named with a prefix, e.g. `mouse:left`.
    pub fn is_key_pressed(&self, key: &str) -> bool {
        let descriptor = parse_binding_string(key);
        self.pressed
            .is_pressed(&held_key_name(descriptor.device_type, &descriptor.key))
    }

    /// Names of all pressed actions, sorted
    pub fn pressed_actions(&self) -> Vec<String> {
        self.actions.pressed_actions()
    }

    pub fn pressed_keys(&self) -> &PressedKeys {
        &self.pressed
    }

    pub fn recent_inputs(
        &self,
        count: Option<usize>,
        filter: Option<&HistoryFilter>,
    ) -> Vec<InputHistoryEntry> {
        self.history.recent_inputs(count, filter)
    }

    pub fn inputs_in_time_window(
        &self,
        window: Duration,
        filter: Option<&HistoryFilter>,
    ) -> Vec<InputHistoryEntry> {
        self.history.inputs_in_time_window(window, self.clock, filter)
    }

    pub fn find_sequence_pattern(
        &self,
        pattern: &[InputPattern],
        window: Duration,
        exact: bool,
    ) -> Option<PatternMatch> {
        self.history
            .find_sequence_pattern(pattern, window, self.clock, exact)
    }

    // --- events ---

    /// Subscribe to events named `name`
    pub fn on<F>(&mut self, name: &'static str, listener: F)
    where
        F: FnMut(&InputEvent) + 'static,
    {
        self.events.on(name, listener);
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<InputEvent> {
        self.events.drain()
    }

    fn report(&mut self, err: InputError, context: &str) {
        error!("{} failed: {}", context, err);
        self.events.emit(InputEvent::error(&err, context));
    }

    /// Clear action state, held keys, history and in-flight combos
    pub fn reset(&mut self) {
        self.actions.reset();
        self.pressed.clear();
        self.history.clear();
        self.combos.reset();
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new(InputSettings::default())
    }
}
