//! Keyed, read-only configuration lookup.

use std::collections::HashMap;

/// A read-only source of configuration values.
///
/// Keys are fixed upper-case names such as `OPENBMC_HOST` or `SSH_PORT`.
pub trait ConfigStore {
    /// Look up a key.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Look up a key, falling back to `default`.
    fn get(&self, key: &str, default: &str) -> String {
        self.lookup(key).unwrap_or_else(|| default.to_string())
    }

    /// Check if a key is set.
    fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Look up a key, treating an empty value as unset.
    fn lookup_non_empty(&self, key: &str) -> Option<String> {
        self.lookup(key).filter(|v| !v.is_empty())
    }
}

impl<T: ConfigStore + ?Sized> ConfigStore for &T {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }

    fn lookup_non_empty(&self, key: &str) -> Option<String> {
        (**self).lookup_non_empty(key)
    }
}

impl<T: ConfigStore + ?Sized> ConfigStore for Box<T> {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }

    fn lookup_non_empty(&self, key: &str) -> Option<String> {
        (**self).lookup_non_empty(key)
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MapStore {
    values: HashMap<String, String>,
}

impl MapStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigStore for MapStore {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Several stores consulted in order; the first hit wins.
///
/// [`ConfigStore::lookup_non_empty`] skips layers holding an empty value.
#[derive(Default)]
pub struct LayeredStore {
    layers: Vec<Box<dyn ConfigStore + Send + Sync>>,
}

impl std::fmt::Debug for LayeredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredStore")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl LayeredStore {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority layer.
    #[must_use]
    pub fn layer(mut self, store: impl ConfigStore + Send + Sync + 'static) -> Self {
        self.layers.push(Box::new(store));
        self
    }
}

impl ConfigStore for LayeredStore {
    fn lookup(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.lookup(key))
    }

    fn lookup_non_empty(&self, key: &str) -> Option<String> {
        self.layers
            .iter()
            .find_map(|layer| layer.lookup_non_empty(key))
    }
}
