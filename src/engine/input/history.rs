// Rolling, time-stamped history of processed inputs

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use super::buffer::Capacity;
use super::keys::{
    fold_key, normalize_key, DeviceType, EventType, InputType, Modifiers, NormalizedInput,
};

/// A processed input as stored in the history
#[derive(Debug, Clone, PartialEq)]
pub struct InputHistoryEntry {
    pub input: NormalizedInput,
    /// Time the entry was recorded
    pub buffer_timestamp: Duration,
    /// Position in the stream of all recorded inputs, never reused
    pub buffer_index: u64,
}

/// Optional restrictions applied to history queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub device_type: Option<DeviceType>,
    pub input_type: Option<InputType>,
    pub event_type: Option<EventType>,
    pub key: Option<String>,
}

impl HistoryFilter {
    pub fn device(device_type: DeviceType) -> Self {
        Self {
            device_type: Some(device_type),
            ..Default::default()
        }
    }

    pub fn event(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
            ..Default::default()
        }
    }

    pub fn matches(&self, input: &NormalizedInput) -> bool {
        self.device_type.map_or(true, |d| d == input.device_type)
            && self.input_type.map_or(true, |t| t == input.input_type)
            && self.event_type.map_or(true, |e| e == input.event_type)
            && self.key.as_ref().map_or(true, |k| *k == input.key)
    }
}

/// Describes one input in a sequence: used by pattern search and combo steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPattern {
    pub key: String,
    /// Event type to match; `None` accepts any
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<Modifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

impl InputPattern {
    /// Match any input on `key`. Keyboard aliases such as `"up"` are
    /// resolved against the device of each input being matched.
    pub fn key(key: &str) -> Self {
        Self {
            key: fold_key(key),
            event_type: None,
            device_type: None,
            modifiers: None,
            min_value: None,
            max_value: None,
        }
    }

    /// Match presses of `key`
    pub fn press(key: &str) -> Self {
        Self::key(key).with_event_type(EventType::Press)
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_device(mut self, device_type: DeviceType) -> Self {
        self.device_type = Some(device_type);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    pub fn with_value_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    /// Check `input` against this pattern.
    ///
    /// With `exact`, the input's modifiers must equal the pattern's; otherwise
    /// the pattern's modifiers only need to be held.
    pub fn matches(&self, input: &NormalizedInput, exact: bool) -> bool {
        if normalize_key(input.device_type, &self.key) != input.key {
            return false;
        }
        if self.event_type.map_or(false, |e| e != input.event_type) {
            return false;
        }
        if self.device_type.map_or(false, |d| d != input.device_type) {
            return false;
        }
        if let Some(modifiers) = &self.modifiers {
            let ok = if exact {
                *modifiers == input.modifiers
            } else {
                modifiers.is_subset_of(&input.modifiers)
            };
            if !ok {
                return false;
            }
        }
        if self.min_value.map_or(false, |min| input.value < min) {
            return false;
        }
        if self.max_value.map_or(false, |max| input.value > max) {
            return false;
        }
        true
    }
}

/// Where a pattern was found in the history
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    /// Index into the searched (time-windowed, chronological) slice
    pub start: usize,
    pub end: usize,
    pub inputs: Vec<InputHistoryEntry>,
    /// Time between the first and last matched input
    pub elapsed: Duration,
}

/// Fixed-capacity FIFO of recent inputs, oldest first
#[derive(Debug)]
pub struct InputHistory {
    entries: VecDeque<InputHistoryEntry>,
    capacity: Capacity,
    next_index: u64,
}

impl InputHistory {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            next_index: 0,
        }
    }

    /// Record an input at time `now`, evicting the oldest entries if full
    pub fn add_input(&mut self, input: &NormalizedInput, now: Duration) {
        if self.capacity.is_disabled() {
            return;
        }
        self.entries.push_back(InputHistoryEntry {
            input: input.clone(),
            buffer_timestamp: now,
            buffer_index: self.next_index,
        });
        self.next_index += 1;

        while self.capacity.is_exceeded_by(self.entries.len()) {
            self.entries.pop_front();
        }
    }

    /// Most recent entries first, up to `count` (all when `None`)
    pub fn recent_inputs(
        &self,
        count: Option<usize>,
        filter: Option<&HistoryFilter>,
    ) -> Vec<InputHistoryEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|entry| filter.map_or(true, |f| f.matches(&entry.input)))
            .take(count.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Entries recorded no earlier than `now - window`, oldest first
    pub fn inputs_in_time_window(
        &self,
        window: Duration,
        now: Duration,
        filter: Option<&HistoryFilter>,
    ) -> Vec<InputHistoryEntry> {
        let cutoff = now.saturating_sub(window);
        let mut found: Vec<InputHistoryEntry> = self
            .entries
            .iter()
            .rev()
            // Entries are in time order, so the first stale one ends the scan
            .take_while(|entry| entry.buffer_timestamp >= cutoff)
            .filter(|entry| filter.map_or(true, |f| f.matches(&entry.input)))
            .cloned()
            .collect();
        found.reverse();
        found
    }

    /// First contiguous run of inputs within `window` that matches `pattern`
    /// element by element.
    pub fn find_sequence_pattern(
        &self,
        pattern: &[InputPattern],
        window: Duration,
        now: Duration,
        exact: bool,
    ) -> Option<PatternMatch> {
        if pattern.is_empty() {
            return None;
        }
        let slice = self.inputs_in_time_window(window, now, None);
        if slice.len() < pattern.len() {
            return None;
        }

        (0..=slice.len() - pattern.len()).find_map(|start| {
            let candidate = &slice[start..start + pattern.len()];
            let all_match = pattern
                .iter()
                .zip(candidate)
                .all(|(p, entry)| p.matches(&entry.input, exact));
            if !all_match {
                return None;
            }
            let first = candidate[0].input.timestamp;
            let last = candidate[candidate.len() - 1].input.timestamp;
            Some(PatternMatch {
                start,
                end: start + pattern.len() - 1,
                inputs: candidate.to_vec(),
                elapsed: last.saturating_sub(first),
            })
        })
    }

    /// Drop entries recorded before `now - max_age`
    pub fn prune_older_than(&mut self, max_age: Duration, now: Duration) {
        let cutoff = now.saturating_sub(max_age);
        while self
            .entries
            .front()
            .map_or(false, |entry| entry.buffer_timestamp < cutoff)
        {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: Capacity) {
        self.capacity = capacity;
        while self.capacity.is_exceeded_by(self.entries.len()) {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for InputHistory {
    fn default() -> Self {
        Self::new(Capacity::Limited(32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn history_of(keys: &[(&str, u64)]) -> InputHistory {
        let mut history = InputHistory::new(Capacity::Unbounded);
        for (key, at) in keys {
            history.add_input(&NormalizedInput::key_press(key).at_millis(*at), ms(*at));
        }
        history
    }

    fn keys_of(entries: &[InputHistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.input.key.as_str()).collect()
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = InputHistory::new(Capacity::Limited(2));
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            history.add_input(&NormalizedInput::key_press(key), ms(i as u64));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(keys_of(&history.recent_inputs(None, None)), vec!["c", "b"]);
    }

    #[test]
    fn test_indexes_keep_increasing_after_eviction() {
        let mut history = InputHistory::new(Capacity::Limited(1));
        history.add_input(&NormalizedInput::key_press("a"), ms(0));
        history.add_input(&NormalizedInput::key_press("b"), ms(1));
        assert_eq!(history.recent_inputs(None, None)[0].buffer_index, 1);
    }

    #[test]
    fn test_disabled_history_stores_nothing() {
        let mut history = InputHistory::new(Capacity::Disabled);
        history.add_input(&NormalizedInput::key_press("a"), ms(0));
        assert!(history.is_empty());
    }

    #[test]
    fn test_recent_inputs_count_and_filter() {
        let mut history = history_of(&[("a", 0), ("b", 10), ("c", 20)]);
        history.add_input(&NormalizedInput::key_release("c").at_millis(30), ms(30));

        assert_eq!(keys_of(&history.recent_inputs(Some(2), None)), vec!["c", "c"]);
        let presses = history.recent_inputs(Some(2), Some(&HistoryFilter::event(EventType::Press)));
        assert_eq!(keys_of(&presses), vec!["c", "b"]);
        let mouse = history.recent_inputs(None, Some(&HistoryFilter::device(DeviceType::Mouse)));
        assert!(mouse.is_empty());
    }

    #[test]
    fn test_time_window_is_chronological() {
        let history = history_of(&[("a", 0), ("b", 500), ("c", 900), ("d", 1000)]);
        let window = history.inputs_in_time_window(ms(500), ms(1000), None);
        assert_eq!(keys_of(&window), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_find_sequence_pattern() {
        let history = history_of(&[("x", 0), ("up", 100), ("up", 200), ("down", 350)]);
        let pattern = [InputPattern::press("up"), InputPattern::press("down")];

        let found = history
            .find_sequence_pattern(&pattern, ms(1000), ms(400), false)
            .unwrap();
        assert_eq!(found.start, 2);
        assert_eq!(found.end, 3);
        assert_eq!(found.elapsed, ms(150));
        assert_eq!(keys_of(&found.inputs), vec!["arrowup", "arrowdown"]);
    }

    #[test]
    fn test_find_sequence_pattern_respects_window() {
        let history = history_of(&[("up", 0), ("down", 100), ("x", 2000)]);
        let pattern = [InputPattern::press("up"), InputPattern::press("down")];
        assert!(history
            .find_sequence_pattern(&pattern, ms(500), ms(2000), false)
            .is_none());
    }

    #[test]
    fn test_pattern_modifiers_exact_or_partial() {
        let mut history = InputHistory::new(Capacity::Unbounded);
        let mods = Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::NONE
        };
        history.add_input(&NormalizedInput::key_press("k").with_modifiers(mods), ms(0));

        let pattern = [InputPattern::press("k").with_modifiers(Modifiers::ctrl())];
        assert!(history
            .find_sequence_pattern(&pattern, ms(100), ms(10), false)
            .is_some());
        assert!(history
            .find_sequence_pattern(&pattern, ms(100), ms(10), true)
            .is_none());
    }

    #[test]
    fn test_pattern_value_bounds() {
        let input =
            NormalizedInput::analog(DeviceType::Gamepad, InputType::Trigger, "right_trigger", 0.9);
        let firm = InputPattern::key("right_trigger").with_value_range(Some(0.8), None);
        let light = InputPattern::key("right_trigger").with_value_range(None, Some(0.5));
        assert!(firm.matches(&input, false));
        assert!(!light.matches(&input, false));
    }

    #[test]
    fn test_pattern_aliases_follow_input_device() {
        let pattern = InputPattern::press("left");
        let arrow = NormalizedInput::key_press("left");
        let click = NormalizedInput::press(DeviceType::Mouse, InputType::Button, "left");
        assert!(pattern.matches(&arrow, false));
        assert!(pattern.matches(&click, false));

        let keyboard_only = InputPattern::press("left").with_device(DeviceType::Keyboard);
        assert!(!keyboard_only.matches(&click, false));
    }

    #[test]
    fn test_prune_older_than() {
        let mut history = history_of(&[("a", 0), ("b", 500), ("c", 1500)]);
        history.prune_older_than(ms(1000), ms(1400));
        assert_eq!(keys_of(&history.recent_inputs(None, None)), vec!["c", "b"]);
    }
}
