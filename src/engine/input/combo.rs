// Multi-step combo detection
//
// Every registered combo can have in-flight sequence instances. Each input is
// offered to the live instances first (advance, or expire on timeout / wrong
// input), then to every combo's first step to spawn new instances. At most one
// completed combo is reported per input.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use super::history::InputPattern;
use super::keys::{DeviceType, EventType, NormalizedInput};
use super::InputError;

/// Invoked after a combo completes; failures are isolated from the matcher
pub type ComboCallback = Box<dyn FnMut(&ComboEvent) -> anyhow::Result<()>>;

/// One step of a combo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboStep {
    #[serde(flatten)]
    pub pattern: InputPattern,
    /// Skipped when the input does not match it
    #[serde(default)]
    pub optional: bool,
}

impl ComboStep {
    pub fn new(pattern: InputPattern) -> Self {
        Self {
            pattern,
            optional: false,
        }
    }

    /// Press of `key`
    pub fn press(key: &str) -> Self {
        Self::new(InputPattern::press(key))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A registered combo
pub struct ComboDefinition {
    pub id: String,
    pub name: String,
    pub steps: Vec<ComboStep>,
    /// Longest allowed gap between two matched inputs
    pub timeout: Duration,
    /// Allow several overlapping instances of this combo
    pub allow_multiple: bool,
    /// Payload copied into the completion event
    pub data: Option<serde_json::Value>,
    callback: Option<ComboCallback>,
}

impl ComboDefinition {
    /// Create a combo; steps must be non-empty and the timeout positive
    pub fn new(id: &str, steps: Vec<ComboStep>, timeout: Duration) -> Result<Self, InputError> {
        if steps.is_empty() {
            return Err(InputError::InvalidInput(format!(
                "combo '{}' has no steps",
                id
            )));
        }
        if timeout.is_zero() {
            return Err(InputError::InvalidInput(format!(
                "combo '{}' needs a positive timeout",
                id
            )));
        }
        Ok(Self {
            id: id.to_string(),
            name: id.to_string(),
            steps,
            timeout,
            allow_multiple: false,
            data: None,
            callback: None,
        })
    }

    /// Combo made of keyboard key presses in order
    pub fn from_keys(id: &str, keys: &[&str], timeout: Duration) -> Result<Self, InputError> {
        let steps = keys
            .iter()
            .map(|k| ComboStep::new(InputPattern::press(k).with_device(DeviceType::Keyboard)))
            .collect();
        Self::new(id, steps, timeout)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn allowing_multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&ComboEvent) -> anyhow::Result<()> + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Find the step at or after `from` that `input` satisfies, skipping
    /// optional steps that it does not.
    fn match_from(&self, from: usize, input: &NormalizedInput) -> Option<usize> {
        for (index, step) in self.steps.iter().enumerate().skip(from) {
            if step.pattern.matches(input, false) {
                return Some(index);
            }
            if !step.optional {
                return None;
            }
        }
        None
    }

    /// Whether a sequence at `current_step` has nothing mandatory left
    fn is_complete_at(&self, current_step: usize) -> bool {
        self.steps
            .get(current_step..)
            .map_or(true, |rest| rest.iter().all(|step| step.optional))
    }
}

impl fmt::Debug for ComboDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComboDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("timeout", &self.timeout)
            .field("allow_multiple", &self.allow_multiple)
            .field("data", &self.data)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Reported when a combo completes
#[derive(Debug, Clone, PartialEq)]
pub struct ComboEvent {
    pub combo_id: String,
    pub name: String,
    /// Keys of the matched inputs, in order
    pub sequence: Vec<String>,
    pub inputs: Vec<NormalizedInput>,
    /// Time from the first to the last matched input
    pub total_time: Duration,
    /// Time of the completing input
    pub timestamp: Duration,
    pub data: Option<serde_json::Value>,
}

/// An in-flight attempt at a combo
#[derive(Debug, Clone)]
struct ComboSequence {
    id: u64,
    combo_id: String,
    current_step: usize,
    inputs: Vec<NormalizedInput>,
    start_time: Duration,
    last_input_time: Duration,
}

/// Tracks combo progress across inputs
#[derive(Debug, Default)]
pub struct ComboMatcher {
    combos: Vec<ComboDefinition>,
    active: Vec<ComboSequence>,
    next_sequence_id: u64,
}

impl ComboMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a combo, replacing any combo with the same id
    pub fn register(&mut self, combo: ComboDefinition) {
        if self.unregister(&combo.id) {
            debug!("Replacing combo '{}'", combo.id);
        }
        self.combos.push(combo);
    }

    /// Remove a combo and its in-flight sequences
    pub fn unregister(&mut self, combo_id: &str) -> bool {
        let before = self.combos.len();
        self.combos.retain(|c| c.id != combo_id);
        self.active.retain(|s| s.combo_id != combo_id);
        before != self.combos.len()
    }

    pub fn combo(&self, combo_id: &str) -> Option<&ComboDefinition> {
        self.combos.iter().find(|c| c.id == combo_id)
    }

    pub fn combo_ids(&self) -> Vec<&str> {
        self.combos.iter().map(|c| c.id.as_str()).collect()
    }

    /// Number of in-flight sequences
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Steps matched so far by the furthest in-flight sequence of a combo
    pub fn progress(&self, combo_id: &str) -> Option<usize> {
        self.active
            .iter()
            .filter(|s| s.combo_id == combo_id)
            .map(|s| s.current_step)
            .max()
    }

    /// Feed one input; returns the combo it completed, if any
    pub fn process_input(&mut self, input: &NormalizedInput) -> Option<ComboEvent> {
        let now = input.timestamp;
        let mut completed: Vec<ComboSequence> = Vec::new();
        let mut consumed_by: HashSet<String> = HashSet::new();
        let mut survivors = Vec::with_capacity(self.active.len());

        for mut sequence in std::mem::take(&mut self.active) {
            let Some(combo) = self.combos.iter().find(|c| c.id == sequence.combo_id) else {
                continue;
            };

            if now.saturating_sub(sequence.last_input_time) > combo.timeout {
                debug!("Combo '{}' sequence {} timed out", combo.id, sequence.id);
                continue;
            }

            match combo.match_from(sequence.current_step, input) {
                Some(step) => {
                    sequence.current_step = step + 1;
                    sequence.inputs.push(input.clone());
                    sequence.last_input_time = now;
                    consumed_by.insert(combo.id.clone());
                    if combo.is_complete_at(sequence.current_step) {
                        completed.push(sequence);
                    } else {
                        survivors.push(sequence);
                    }
                }
                // Releases, repeats and analog noise don't break a sequence
                None if input.event_type != EventType::Press => survivors.push(sequence),
                None => {
                    debug!(
                        "Combo '{}' sequence {} broken by '{}'",
                        combo.id, sequence.id, input.key
                    );
                }
            }
        }
        self.active = survivors;

        for combo in &self.combos {
            if !combo.allow_multiple
                && (consumed_by.contains(&combo.id)
                    || self.active.iter().any(|s| s.combo_id == combo.id))
            {
                continue;
            }
            let Some(step) = combo.match_from(0, input) else {
                continue;
            };

            let sequence = ComboSequence {
                id: self.next_sequence_id,
                combo_id: combo.id.clone(),
                current_step: step + 1,
                inputs: vec![input.clone()],
                start_time: now,
                last_input_time: now,
            };
            self.next_sequence_id += 1;

            if combo.is_complete_at(sequence.current_step) {
                completed.push(sequence);
            } else {
                self.active.push(sequence);
            }
        }

        let winner = completed.into_iter().next()?;
        let combo = self.combo(&winner.combo_id)?;
        debug!("Combo '{}' completed", combo.id);
        Some(ComboEvent {
            combo_id: combo.id.clone(),
            name: combo.name.clone(),
            sequence: winner.inputs.iter().map(|i| i.key.clone()).collect(),
            total_time: now.saturating_sub(winner.start_time),
            timestamp: now,
            data: combo.data.clone(),
            inputs: winner.inputs,
        })
    }

    /// Drop sequences whose last input is older than their combo's timeout
    pub fn prune_expired(&mut self, now: Duration) {
        let combos = &self.combos;
        self.active.retain(|sequence| {
            combos
                .iter()
                .find(|c| c.id == sequence.combo_id)
                .map_or(false, |combo| {
                    now.saturating_sub(sequence.last_input_time) <= combo.timeout
                })
        });
    }

    /// Run the completed combo's callback, isolating errors and panics
    pub fn run_callback(&mut self, event: &ComboEvent) -> Result<(), InputError> {
        let Some(combo) = self.combos.iter_mut().find(|c| c.id == event.combo_id) else {
            return Ok(());
        };
        let Some(callback) = combo.callback.as_mut() else {
            return Ok(());
        };

        match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!("Combo '{}' callback failed: {:#}", event.combo_id, err);
                Err(InputError::Callback(format!("{}: {:#}", event.combo_id, err)))
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "callback panicked".to_string());
                warn!("Combo '{}' callback panicked: {}", event.combo_id, message);
                Err(InputError::Callback(format!("{}: {}", event.combo_id, message)))
            }
        }
    }

    /// Forget all in-flight sequences, keeping registrations
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.active.clear();
        self.combos.clear();
    }
}
