//! Pluggable key-value persistence for the selection cache.
//!
//! The dataset is tiny (one JSON document), so the trait is deliberately
//! minimal: whole-value get and put under a string key. The in-memory
//! store backs tests and cache-disabled deployments; the sled store gives
//! durability across restarts.

use crate::errors::StoreError;
use parking_lot::RwLock;
use std::{collections::HashMap, path::Path};

/// Whole-value key-value storage.
///
/// `put` must be atomic with respect to `get`: a concurrent reader sees
/// either the previous or the new value, never a mix.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Embedded on-disk store.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(Self { db })
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.db
            .get(key)
            .map(|value| value.map(|ivec| ivec.to_vec()))
            .map_err(|e| StoreError::Read(e.to_string()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.db
            .insert(key, value)
            .map(|_| ())
            .map_err(|e| StoreError::Write(e.to_string()))?;
        self.db.flush().map(|_| ()).map_err(|e| StoreError::Write(e.to_string()))
    }
}
