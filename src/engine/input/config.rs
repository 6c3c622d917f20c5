// Input configuration model and persistence
//
// The on-disk shape is plain JSON:
//
// {
//   "bindings": {
//     "default": { "move_up": ["w", "up"], "jump": "space" },
//     "menu": { "back": { "deviceType": "keyboard", "inputType": "key", "key": "escape" } }
//   },
//   "settings": { "bufferSize": 32, "analogDeadzone": 0.1 }
// }

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::binding::BindingDescriptor;
use super::keys::{normalize_key, parse_binding_string};
use super::InputError;

/// context -> action -> binding spec
pub type BindingsConfig = BTreeMap<String, BTreeMap<String, BindingSpec>>;

const DEFAULT_BUFFER_SIZE: i64 = 32;
const DEFAULT_PRESSED_CAPACITY: i64 = 16;
const DEFAULT_ANALOG_DEADZONE: f64 = 0.1;
const DEFAULT_COMBO_TIMEOUT_MS: u64 = 1000;
const DEFAULT_CONTEXT: &str = "default";
const DEFAULT_MAX_LOAD_ATTEMPTS: u32 = 3;
const DEFAULT_HISTORY_MAX_AGE_MS: u64 = 0;

/// One binding, written either as a string or as a full descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingEntry {
    Text(String),
    Descriptor(BindingDescriptor),
}

impl BindingEntry {
    /// Canonical descriptor for this entry
    pub fn to_descriptor(&self) -> BindingDescriptor {
        match self {
            BindingEntry::Text(text) => parse_binding_string(text),
            BindingEntry::Descriptor(descriptor) => {
                let mut descriptor = descriptor.clone();
                descriptor.key = normalize_key(descriptor.device_type, &descriptor.key);
                descriptor
            }
        }
    }

    /// Prefer the short string form when it loses nothing
    pub fn from_descriptor(descriptor: &BindingDescriptor) -> Self {
        if descriptor.has_default_tuning() {
            let text = descriptor.to_binding_string();
            if parse_binding_string(&text) == *descriptor {
                return BindingEntry::Text(text);
            }
        }
        BindingEntry::Descriptor(descriptor.clone())
    }
}

impl From<&str> for BindingEntry {
    fn from(text: &str) -> Self {
        BindingEntry::Text(text.to_string())
    }
}

impl From<String> for BindingEntry {
    fn from(text: String) -> Self {
        BindingEntry::Text(text)
    }
}

impl From<BindingDescriptor> for BindingEntry {
    fn from(descriptor: BindingDescriptor) -> Self {
        BindingEntry::Descriptor(descriptor)
    }
}

/// All bindings configured for one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingSpec {
    Single(BindingEntry),
    Multiple(Vec<BindingEntry>),
}

impl BindingSpec {
    pub fn entries(&self) -> &[BindingEntry] {
        match self {
            BindingSpec::Single(entry) => std::slice::from_ref(entry),
            BindingSpec::Multiple(entries) => entries,
        }
    }

    /// Append another binding, widening a single entry into a list
    pub fn push(&mut self, entry: BindingEntry) {
        match self {
            BindingSpec::Single(existing) => {
                *self = BindingSpec::Multiple(vec![existing.clone(), entry]);
            }
            BindingSpec::Multiple(entries) => entries.push(entry),
        }
    }
}

impl From<&str> for BindingSpec {
    fn from(text: &str) -> Self {
        BindingSpec::Single(text.into())
    }
}

impl From<Vec<&str>> for BindingSpec {
    fn from(texts: Vec<&str>) -> Self {
        BindingSpec::Multiple(texts.into_iter().map(BindingEntry::from).collect())
    }
}

/// Tunables for the input pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputSettings {
    /// History capacity: -1 unbounded, 0 disabled
    pub buffer_size: i64,

    /// Capacity of the held-key set: -1 unbounded, 0 disabled
    pub pressed_capacity: i64,

    /// Magnitude below which an analog action counts as released
    pub analog_deadzone: f64,

    /// Timeout for combos registered from a plain key list
    pub combo_timeout_ms: u64,

    /// Context pushed by `initialize`
    pub default_context: String,

    /// Attempts made by `load_config` before falling back to empty bindings
    pub max_load_attempts: u32,

    /// History entries older than this are dropped each update; 0 keeps them
    pub history_max_age_ms: u64,

    /// Unrecognized settings, preserved across load/save
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            pressed_capacity: DEFAULT_PRESSED_CAPACITY,
            analog_deadzone: DEFAULT_ANALOG_DEADZONE,
            combo_timeout_ms: DEFAULT_COMBO_TIMEOUT_MS,
            default_context: DEFAULT_CONTEXT.to_string(),
            max_load_attempts: DEFAULT_MAX_LOAD_ATTEMPTS,
            history_max_age_ms: DEFAULT_HISTORY_MAX_AGE_MS,
            extra: BTreeMap::new(),
        }
    }
}

/// Persisted bindings plus settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub bindings: BindingsConfig,
    pub settings: InputSettings,
}

impl InputConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, InputError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Storage backend for input configuration
pub trait ConfigStore {
    fn load(&mut self) -> Result<InputConfig, InputError>;
    fn save(&mut self, config: &InputConfig) -> Result<(), InputError>;
}

/// Stores the configuration as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&mut self) -> Result<InputConfig, InputError> {
        let text = fs::read_to_string(&self.path)?;
        let config = InputConfig::from_json(&text)?;
        info!("Loaded input config from {:?}", self.path);
        Ok(config)
    }

    fn save(&mut self, config: &InputConfig) -> Result<(), InputError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, config.to_json()?)?;
        info!("Saved input config to {:?}", self.path);
        Ok(())
    }
}

/// Keeps the configuration in memory; loading before any save fails
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    config: Option<InputConfig>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InputConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    pub fn stored(&self) -> Option<&InputConfig> {
        self.config.as_ref()
    }
}

impl ConfigStore for MemoryStore {
    fn load(&mut self) -> Result<InputConfig, InputError> {
        self.config
            .clone()
            .ok_or_else(|| InputError::Storage("no configuration stored".to_string()))
    }

    fn save(&mut self, config: &InputConfig) -> Result<(), InputError> {
        self.config = Some(config.clone());
        Ok(())
    }
}
