//! Injectable store of engines keyed by dataset identifier

use crate::algorithm::engine::MotifEngine;
use crate::io::error::{Result, not_found};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Outcome of registering an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The engine was stored under a new id
    Registered,
    /// The id was taken; the existing engine was kept
    AlreadyExists,
}

/// Store of engines owned by the caller
///
/// Implementations must be shareable across request threads.
pub trait DatasetRegistry: Send + Sync {
    /// Store `engine` under `id` unless the id is already taken
    fn register(&self, id: &str, engine: MotifEngine) -> Registration;

    /// Engine registered under `id`
    ///
    /// # Errors
    ///
    /// Returns a not found error for an unknown id
    fn lookup(&self, id: &str) -> Result<Arc<MotifEngine>>;

    /// Registered ids in ascending order
    fn list(&self) -> Vec<String>;

    /// Drop the engine under `id`, reporting whether one existed
    fn remove(&self, id: &str) -> bool;

    /// Whether `id` is registered
    fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_ok()
    }
}

/// Process-lifetime registry held in memory
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    engines: RwLock<BTreeMap<String, Arc<MotifEngine>>>,
}

impl InMemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered datasets
    pub fn len(&self) -> usize {
        self.engines.read().len()
    }

    /// Whether no dataset is registered
    pub fn is_empty(&self) -> bool {
        self.engines.read().is_empty()
    }
}

impl DatasetRegistry for InMemoryRegistry {
    fn register(&self, id: &str, engine: MotifEngine) -> Registration {
        let mut engines = self.engines.write();
        if engines.contains_key(id) {
            info!(dataset = id, "dataset already registered");
            return Registration::AlreadyExists;
        }
        engines.insert(id.to_string(), Arc::new(engine));
        info!(dataset = id, "dataset registered");
        Registration::Registered
    }

    fn lookup(&self, id: &str) -> Result<Arc<MotifEngine>> {
        self.engines
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("dataset", &id))
    }

    fn list(&self) -> Vec<String> {
        self.engines.read().keys().cloned().collect()
    }

    fn remove(&self, id: &str) -> bool {
        let removed = self.engines.write().remove(id).is_some();
        if removed {
            info!(dataset = id, "dataset removed");
        }
        removed
    }

    fn contains(&self, id: &str) -> bool {
        self.engines.read().contains_key(id)
    }
}
