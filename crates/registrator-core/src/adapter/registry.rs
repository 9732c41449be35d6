//! Adapter capability registry

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::AdapterFactory;

/// Maps URI schemes to backend factories.
///
/// Built once at the composition root; backends add themselves through an
/// explicit registration call before the Bridge is constructed. The first
/// factory registered for a scheme wins.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: RwLock<HashMap<String, Arc<dyn AdapterFactory>>>,
}

impl AdapterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `scheme`.
    ///
    /// Returns `false` and keeps the existing factory if the scheme is
    /// already taken.
    pub fn register(&self, factory: Arc<dyn AdapterFactory>, scheme: &str) -> bool {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(scheme) {
            tracing::debug!(scheme, "adapter scheme already registered, ignoring");
            return false;
        }
        factories.insert(scheme.to_string(), factory);
        true
    }

    /// Look up the factory for `scheme`.
    pub fn lookup(&self, scheme: &str) -> Option<Arc<dyn AdapterFactory>> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scheme)
            .cloned()
    }

    /// Check if a scheme is registered.
    pub fn contains(&self, scheme: &str) -> bool {
        self.lookup(scheme).is_some()
    }

    /// List all registered schemes (sorted).
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        schemes.sort();
        schemes
    }

    /// Number of registered schemes.
    pub fn len(&self) -> usize {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
