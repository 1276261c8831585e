//! Persistent key-value store seam and the in-memory implementation

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use futures::future::{BoxFuture, FutureExt};

use crate::error::StoreError;

/// Asynchronous string key-value store backing the timer snapshot
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when the key is absent
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    /// Replace the value stored under `key`
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Process-local store; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite an entry without going through the async API
    pub fn insert(&self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock()
            .map_err(|e| StoreError::Unavailable(format!("Failed to lock memory store: {}", e)))?;
        entries.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Current value under `key`
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().ok().and_then(|entries| entries.get(key).cloned())
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        let result = self.entries.lock()
            .map(|entries| entries.get(key).cloned())
            .map_err(|e| StoreError::Unavailable(format!("Failed to lock memory store: {}", e)));
        async move { result }.boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        let result = self.insert(key, value);
        async move { result }.boxed()
    }
}
