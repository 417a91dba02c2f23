//! Service cache: built instances by name.
//!
//! Entries are written once and never replaced, evicted or invalidated.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::trace;

use crate::argument::Instance;

#[derive(Debug, Default)]
pub(crate) struct ServiceCache {
    services: HashMap<String, Instance>,
}

impl ServiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Stores `instance` unless `name` is already cached.
    ///
    /// Returns the instance that ends up cached under `name`: the new one,
    /// or the one stored first.
    pub fn insert(&mut self, name: String, instance: Instance) -> Instance {
        match self.services.entry(name) {
            Entry::Occupied(existing) => {
                trace!(service = %existing.key(), "Service already cached, keeping first instance");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                trace!(service = %slot.key(), "Caching service");
                slot.insert(instance).clone()
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }
}
