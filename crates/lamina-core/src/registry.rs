//! Engine registry: resolves engine identifiers into cached, configured handles
//!
//! The registry is an explicit instance passed by reference to call sites,
//! not an implicit global. Handles are created lazily on first resolve and
//! shared by every caller using the same identifier.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::error::EngineConfigurationError;

/// Flat configuration mapping from dotted key (`"production.key"`) to value
///
/// Merging is key-overwrite: a later value for the same dotted key replaces
/// the earlier one wholesale, never a partial deep merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    entries: BTreeMap<String, Value>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Overlay `other` on top of this config, key by key
    pub fn merge(&mut self, other: &EngineConfig) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for EngineConfig {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A resolved, configured reference to a model-serving backend
///
/// Handles are shared: cloning gives another reference to the same handle,
/// and config merges performed through any clone are visible to all of them.
/// The config mutex serializes concurrent merges for the same identifier.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    id: String,
    config: Mutex<EngineConfig>,
}

impl EngineHandle {
    fn new(id: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: id.into(),
                config: Mutex::new(config),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> EngineConfig {
        self.lock_config().clone()
    }

    /// Look up one configuration value by dotted key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock_config().get(key).cloned()
    }

    /// Whether two handles are the same shared handle, not merely equal
    pub fn same_handle(a: &EngineHandle, b: &EngineHandle) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    fn merge(&self, config: &EngineConfig) {
        self.lock_config().merge(config);
    }

    fn lock_config(&self) -> MutexGuard<'_, EngineConfig> {
        // A poisoned lock only means a panic elsewhere mid-merge; the map
        // itself is still a usable flat mapping.
        self.inner
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Verify the listed keys are present, in the order given
    pub fn require_keys<'a, I>(&self, keys: I) -> Result<(), EngineConfigurationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let config = self.lock_config();
        for key in keys {
            if !config.contains(key) {
                return Err(EngineConfigurationError::missing_key(self.id(), key));
            }
        }
        Ok(())
    }
}

/// Registry of engine handles keyed by textual identifier
///
/// Configuration precedence, highest to lowest: config explicitly passed to
/// `resolve_with`, process-wide defaults set at startup, backend built-in
/// defaults. Missing optional keys fall through to the next tier.
pub struct EngineRegistry {
    engines: Mutex<HashMap<String, EngineHandle>>,
    builtins: EngineConfig,
    defaults: EngineConfig,
    required: Vec<String>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EngineRegistryBuilder {
        EngineRegistryBuilder::default()
    }

    /// Resolve an engine identifier with no configuration overrides
    pub fn resolve(&self, id: &str) -> Result<EngineHandle, EngineConfigurationError> {
        self.resolve_with(id, None)
    }

    /// Resolve an engine identifier, merging `config` over what is already known
    ///
    /// The first resolution for an identifier creates its handle; later
    /// resolutions return the same handle (reference-identical) and merge any
    /// newly supplied config into it in place. Fails if a required key is
    /// still absent after the merge.
    pub fn resolve_with(
        &self,
        id: &str,
        config: Option<&EngineConfig>,
    ) -> Result<EngineHandle, EngineConfigurationError> {
        let mut engines = self
            .engines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let handle = match engines.get(id) {
            Some(handle) => {
                if let Some(config) = config {
                    handle.merge(config);
                }
                handle.clone()
            }
            None => {
                let mut merged = self.builtins.clone();
                merged.merge(&self.defaults);
                if let Some(config) = config {
                    merged.merge(config);
                }
                let handle = EngineHandle::new(id, merged);
                engines.insert(id.to_string(), handle.clone());
                handle
            }
        };
        drop(engines);

        handle.require_keys(self.required.iter().map(String::as_str))?;
        Ok(handle)
    }

    /// Drop the cached handle for an identifier
    ///
    /// Callers still holding the handle keep a working reference; the next
    /// resolve for this identifier starts over from the default tiers.
    pub fn teardown(&self, id: &str) -> bool {
        self.engines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
            .is_some()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for an [`EngineRegistry`]
#[derive(Default)]
pub struct EngineRegistryBuilder {
    builtins: EngineConfig,
    defaults: EngineConfig,
    required: Vec<String>,
}

impl EngineRegistryBuilder {
    /// Set a backend built-in default (lowest precedence tier)
    pub fn builtin(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.builtins.insert(key, value);
        self
    }

    /// Set one process-wide default (middle precedence tier)
    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    /// Set all process-wide defaults at once
    pub fn default_config(mut self, config: EngineConfig) -> Self {
        self.defaults = config;
        self
    }

    /// Require a key to be present on every resolved handle
    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    pub fn build(self) -> EngineRegistry {
        EngineRegistry {
            engines: Mutex::new(HashMap::new()),
            builtins: self.builtins,
            defaults: self.defaults,
            required: self.required,
        }
    }
}
