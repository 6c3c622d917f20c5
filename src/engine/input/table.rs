// Per-context binding table with a versioned lookup cache

use log::debug;
use std::collections::HashMap;

use super::binding::{binding_key, matches_binding, Action, ActionBinding, BindingDescriptor};
use super::config::{BindingEntry, BindingSpec, BindingsConfig};
use super::keys::{Modifiers, NormalizedInput};

/// Cache entries beyond this count are dropped wholesale
const MAX_CACHE_ENTRIES: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    context: String,
    input_key: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    version: u64,
    candidates: Vec<ActionBinding>,
}

/// Maps canonical binding keys to actions, separately for every context.
///
/// The same binding key may carry several actions; all of them fire. Lookups
/// are memoized per `(context, input key)` and every entry is tagged with the
/// cache version it was computed under. Any mutation or context switch bumps
/// the version, which retires all older entries at once.
#[derive(Debug)]
pub struct BindingTable {
    /// context -> binding key -> bindings in insertion order
    contexts: HashMap<String, HashMap<String, Vec<ActionBinding>>>,

    /// Context used when a lookup names none
    active_context: String,

    cache: HashMap<CacheKey, CacheEntry>,
    cache_version: u64,
}

impl BindingTable {
    /// Create an empty table whose active context is `active_context`
    pub fn new(active_context: &str) -> Self {
        Self {
            contexts: HashMap::new(),
            active_context: active_context.to_string(),
            cache: HashMap::new(),
            cache_version: 0,
        }
    }

    /// Replace every context's bindings with the contents of `config`
    pub fn load_bindings(&mut self, config: &BindingsConfig) {
        self.contexts.clear();
        let mut total = 0;
        for (context, actions) in config {
            // Keep explicitly listed contexts even when they bind nothing
            self.contexts.entry(context.clone()).or_default();
            for (action, spec) in actions {
                for entry in spec.entries() {
                    self.insert(context, action, entry.to_descriptor());
                    total += 1;
                }
            }
        }
        self.invalidate();
        debug!(
            "Loaded {} bindings across {} contexts",
            total,
            self.contexts.len()
        );
    }

    /// Bind `binding` to `action` in `context`, alongside any existing bindings
    pub fn add_binding(&mut self, context: &str, action: &str, binding: impl Into<BindingEntry>) {
        let descriptor = binding.into().to_descriptor();
        self.insert(context, action, descriptor);
        self.invalidate();
    }

    /// Remove `action` from one binding, or from every binding in the context
    /// when `binding` is `None`. Returns how many bindings were removed.
    pub fn remove_binding(
        &mut self,
        context: &str,
        action: &str,
        binding: Option<BindingEntry>,
    ) -> usize {
        let Some(keys) = self.contexts.get_mut(context) else {
            return 0;
        };

        let mut removed = 0;
        match binding {
            Some(binding) => {
                let key = binding.to_descriptor().binding_key();
                if let Some(list) = keys.get_mut(&key) {
                    let before = list.len();
                    list.retain(|b| b.action != action);
                    removed = before - list.len();
                    if list.is_empty() {
                        keys.remove(&key);
                    }
                }
            }
            None => {
                for list in keys.values_mut() {
                    let before = list.len();
                    list.retain(|b| b.action != action);
                    removed += before - list.len();
                }
                keys.retain(|_, list| !list.is_empty());
            }
        }

        if removed > 0 {
            self.invalidate();
        }
        removed
    }

    /// Resolve an input into the actions bound to it in `context`, or in the
    /// active context when `context` is `None`.
    ///
    /// An unknown context or unbound key yields an empty list.
    pub fn map_input_to_actions(
        &mut self,
        input: &NormalizedInput,
        context: Option<&str>,
    ) -> Vec<Action> {
        let context = context.unwrap_or(&self.active_context).to_string();
        let input_key = binding_key(
            input.device_type,
            input.input_type,
            &input.key,
            &input.modifiers,
        );
        let cache_key = CacheKey {
            context,
            input_key,
        };

        let cached = self
            .cache
            .get(&cache_key)
            .filter(|entry| entry.version == self.cache_version)
            .map(|entry| entry.candidates.clone());

        let candidates = match cached {
            Some(candidates) => candidates,
            None => {
                let candidates =
                    self.collect_candidates(&cache_key.context, &cache_key.input_key, input);
                if self.cache.len() >= MAX_CACHE_ENTRIES {
                    self.cache.clear();
                }
                self.cache.insert(
                    cache_key.clone(),
                    CacheEntry {
                        version: self.cache_version,
                        candidates: candidates.clone(),
                    },
                );
                candidates
            }
        };

        candidates
            .iter()
            .filter(|binding| matches_binding(&binding.descriptor, input))
            .map(|binding| Action::from_binding(binding, input, &cache_key.context))
            .collect()
    }

    /// Bindings stored under the input's full key and under its bare key
    fn collect_candidates(
        &self,
        context: &str,
        input_key: &str,
        input: &NormalizedInput,
    ) -> Vec<ActionBinding> {
        let Some(keys) = self.contexts.get(context) else {
            return Vec::new();
        };

        let mut lookup_keys = vec![input_key.to_string()];
        if !input.modifiers.is_empty() {
            lookup_keys.push(binding_key(
                input.device_type,
                input.input_type,
                &input.key,
                &Modifiers::NONE,
            ));
        }

        lookup_keys
            .iter()
            .filter_map(|key| keys.get(key))
            .flatten()
            .filter(|binding| {
                let descriptor = &binding.descriptor;
                descriptor.device_type == input.device_type
                    && descriptor.input_type == input.input_type
                    && descriptor.key == input.key
                    && descriptor.modifiers.is_subset_of(&input.modifiers)
            })
            .cloned()
            .collect()
    }

    fn insert(&mut self, context: &str, action: &str, descriptor: BindingDescriptor) {
        let key = descriptor.binding_key();
        self.contexts
            .entry(context.to_string())
            .or_default()
            .entry(key)
            .or_default()
            .push(ActionBinding::new(action, descriptor));
    }

    fn invalidate(&mut self) {
        self.cache_version += 1;
    }

    /// Switch the context used by lookups that name none
    pub fn set_active_context(&mut self, context: &str) {
        if self.active_context != context {
            self.active_context = context.to_string();
            self.invalidate();
        }
    }

    pub fn active_context(&self) -> &str {
        &self.active_context
    }

    pub fn cache_version(&self) -> u64 {
        self.cache_version
    }

    /// Names of all contexts that have ever held bindings
    pub fn contexts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.contexts.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every descriptor bound to `action` in `context`
    pub fn bindings_for_action(&self, context: &str, action: &str) -> Vec<BindingDescriptor> {
        let mut descriptors: Vec<BindingDescriptor> = self
            .contexts
            .get(context)
            .into_iter()
            .flat_map(|keys| keys.values())
            .flatten()
            .filter(|binding| binding.action == action)
            .map(|binding| binding.descriptor.clone())
            .collect();
        descriptors.sort_by_key(|descriptor| descriptor.binding_key());
        descriptors
    }

    /// Total number of action bindings across all contexts
    pub fn binding_count(&self) -> usize {
        self.contexts
            .values()
            .flat_map(|keys| keys.values())
            .map(Vec::len)
            .sum()
    }

    /// Drop all bindings in every context
    pub fn clear(&mut self) {
        self.contexts.clear();
        self.cache.clear();
        self.invalidate();
    }

    /// Export the table in the configuration format
    pub fn to_config(&self) -> BindingsConfig {
        let mut config = BindingsConfig::new();
        for (context, keys) in &self.contexts {
            let actions = config.entry(context.clone()).or_default();
            let mut bindings: Vec<&ActionBinding> = keys.values().flatten().collect();
            bindings.sort_by_key(|binding| binding.descriptor.binding_key());
            for binding in bindings {
                let entry = BindingEntry::from_descriptor(&binding.descriptor);
                match actions.get_mut(&binding.action) {
                    Some(spec) => spec.push(entry),
                    None => {
                        actions.insert(binding.action.clone(), BindingSpec::Single(entry));
                    }
                }
            }
        }
        config
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new("default")
    }
}
