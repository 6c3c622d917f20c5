// Bounded set of currently held keys

use std::collections::VecDeque;

/// How many entries a bounded input store may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Storage disabled, every insert is a no-op
    Disabled,
    /// At most this many entries, oldest evicted first
    Limited(usize),
    Unbounded,
}

impl Capacity {
    /// Interpret a configured size: negative is unbounded, zero disables storage
    pub fn from_setting(size: i64) -> Self {
        match size {
            s if s < 0 => Capacity::Unbounded,
            0 => Capacity::Disabled,
            s => Capacity::Limited(s as usize),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Capacity::Disabled)
    }

    /// Whether `len` entries exceed this capacity
    pub fn is_exceeded_by(&self, len: usize) -> bool {
        match self {
            Capacity::Disabled => len > 0,
            Capacity::Limited(max) => len > *max,
            Capacity::Unbounded => false,
        }
    }
}

/// Keys currently held down, in the order they were pressed.
///
/// A key is stored at most once. When the set grows past its capacity the
/// key pressed longest ago is dropped.
#[derive(Debug)]
pub struct PressedKeys {
    keys: VecDeque<String>,
    capacity: Capacity,
}

impl PressedKeys {
    pub fn new(capacity: Capacity) -> Self {
        let initial = match capacity {
            Capacity::Limited(max) => max.min(64),
            _ => 0,
        };
        Self {
            keys: VecDeque::with_capacity(initial),
            capacity,
        }
    }

    /// Record a held key
    pub fn add(&mut self, key: &str) {
        if self.capacity.is_disabled() || self.is_pressed(key) {
            return;
        }
        self.keys.push_back(key.to_string());

        while self.capacity.is_exceeded_by(self.keys.len()) {
            self.keys.pop_front();
        }
    }

    /// Forget a key; returns true if it was held
    pub fn remove(&mut self, key: &str) -> bool {
        if let Some(pos) = self.keys.iter().position(|k| k == key) {
            self.keys.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Whether every key in `keys` is held
    pub fn are_pressed(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.is_pressed(key))
    }

    /// Whether at least one key in `keys` is held
    pub fn is_any_pressed(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.is_pressed(key))
    }

    /// Held keys, oldest first
    pub fn pressed(&self) -> Vec<String> {
        self.keys.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Change the capacity, evicting the oldest keys if needed
    pub fn set_capacity(&mut self, capacity: Capacity) {
        self.capacity = capacity;
        while self.capacity.is_exceeded_by(self.keys.len()) {
            self.keys.pop_front();
        }
    }
}

impl Default for PressedKeys {
    fn default() -> Self {
        Self::new(Capacity::Limited(16))
    }
}
