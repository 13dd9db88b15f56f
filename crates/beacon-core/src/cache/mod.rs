//! Durable per-chain selection cache with TTL freshness.
//!
//! The entire cache lives in one JSON document (one [`CacheRoot`]) under
//! a single KV key; every update rewrites the whole document, relying on
//! the store's atomic put for torn-read freedom. Store failures never
//! reach callers: reads degrade to a miss, writes are dropped, both with
//! a log line.

pub mod store;

use crate::{
    errors::StoreError,
    types::{unix_ms, CacheRoot, ChainCacheEntry, ChainId, ProbeMap},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

pub use store::{KvStore, MemoryStore, SledStore};

/// Default KV key holding the serialized cache root.
pub const DEFAULT_CACHE_KEY: &str = "permit2RpcManagerCache";

/// Default entry time-to-live (one hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(3_600_000);

/// TTL-checked view over the persisted [`CacheRoot`].
///
/// Disabled mode keeps the API intact but turns every read into a miss
/// and every write into a no-op, forcing callers to re-probe.
pub struct SelectionCache {
    store: Arc<dyn KvStore>,
    key: String,
    ttl: Duration,
    disabled: bool,
}

impl SelectionCache {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>, ttl: Duration, disabled: bool) -> Self {
        Self { store, key: key.into(), ttl, disabled }
    }

    /// Whether this cache ignores reads and drops writes.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the entry only if it is within its TTL. Always `None` in
    /// disabled mode.
    #[must_use]
    pub fn get_fresh(&self, chain_id: ChainId) -> Option<ChainCacheEntry> {
        self.get_raw(chain_id).filter(|entry| self.is_fresh(entry))
    }

    /// Returns whatever is stored for the chain regardless of freshness.
    /// Always `None` in disabled mode.
    #[must_use]
    pub fn get_raw(&self, chain_id: ChainId) -> Option<ChainCacheEntry> {
        if self.disabled {
            return None;
        }
        self.load_root().remove(&chain_id)
    }

    /// Replaces the chain's entry, stamping it with the current time, and
    /// persists the whole root. A store failure is logged and the write
    /// dropped; the caller's in-memory view is unaffected.
    pub fn put(&self, chain_id: ChainId, probe_map: ProbeMap, fastest_url: Option<String>) {
        if self.disabled {
            return;
        }

        let mut root = self.load_root();
        root.insert(
            chain_id,
            ChainCacheEntry { last_tested_unix_ms: unix_ms(), probe_map, fastest_url },
        );

        match self.persist_root(&root) {
            Ok(()) => debug!(chain_id, "selection cache updated"),
            Err(e) => warn!(chain_id, error = %e, "dropping selection cache write"),
        }
    }

    /// Whether the entry's probe round is within the TTL window.
    #[must_use]
    pub fn is_fresh(&self, entry: &ChainCacheEntry) -> bool {
        let age_ms = unix_ms().saturating_sub(entry.last_tested_unix_ms);
        u128::try_from(age_ms).is_ok_and(|age| age < self.ttl.as_millis())
    }

    fn load_root(&self) -> CacheRoot {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheRoot::new(),
            Err(e) => {
                warn!(error = %e, "selection cache read failed, treating as miss");
                return CacheRoot::new();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "selection cache is not valid JSON, treating as miss");
                CacheRoot::new()
            }
        }
    }

    fn persist_root(&self, root: &CacheRoot) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(root)?;
        self.store.put(&self.key, &raw)
    }
}
