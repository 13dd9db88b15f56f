//! Ranked endpoint selection with single-flight probing.
//!
//! The selector answers "which URLs should a call for this chain try, in
//! what order". It serves fresh cache entries directly; anything else
//! triggers a probe round, guarded so a burst of concurrent callers on
//! the same cold chain pays for exactly one round.

use crate::{
    cache::SelectionCache,
    probe::Prober,
    types::{ChainId, ProbeMap, ProbeResult},
    whitelist::Whitelist,
};
use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

/// A probe round in progress, awaitable by any number of callers.
type SharedProbe = Shared<BoxFuture<'static, ProbeMap>>;

/// Per-chain endpoint selection over whitelist, prober and cache.
pub struct Selector {
    whitelist: Arc<Whitelist>,
    prober: Prober,
    cache: Arc<SelectionCache>,
    in_flight: Mutex<HashMap<ChainId, SharedProbe>>,
}

/// Orders usable probe results into a dispatch list.
///
/// Hard failures are dropped; the rest sort by status tier first (synced
/// witness hosts ahead of wrong-bytecode hosts ahead of syncing nodes),
/// then by measured latency. The sort is stable, so ties keep the probe
/// map's deterministic iteration order.
#[must_use]
pub fn rank(probe_map: &ProbeMap) -> Vec<String> {
    let mut usable: Vec<&ProbeResult> =
        probe_map.values().filter(|r| r.status.is_acceptable()).collect();
    usable.sort_by_key(|r| (r.status.tier(), r.latency_ms));
    usable.into_iter().map(|r| r.url.clone()).collect()
}

impl Selector {
    #[must_use]
    pub fn new(whitelist: Arc<Whitelist>, prober: Prober, cache: Arc<SelectionCache>) -> Self {
        Self { whitelist, prober, cache, in_flight: Mutex::new(HashMap::new()) }
    }

    /// Returns the ordered list of usable endpoint URLs for a chain,
    /// probing first when the cache cannot answer.
    ///
    /// A fresh entry is honored in two forms: a usable `fastest_url`
    /// yields its ranking, and a recorded all-failed round (`fastest_url`
    /// absent) yields the empty list without re-probing until the TTL
    /// expires. A fresh entry whose fastest endpoint has dropped out of
    /// the usable tiers is treated as invalid and re-probed.
    pub async fn ranked_list(self: &Arc<Self>, chain_id: ChainId) -> Vec<String> {
        if let Some(entry) = self.cache.get_fresh(chain_id) {
            match &entry.fastest_url {
                None => {
                    debug!(chain_id, "cache records no usable endpoints, skipping probe");
                    return Vec::new();
                }
                Some(fastest)
                    if entry
                        .probe_map
                        .get(fastest)
                        .is_some_and(|r| r.status.is_acceptable()) =>
                {
                    return rank(&entry.probe_map);
                }
                Some(fastest) => {
                    debug!(chain_id, url = %fastest, "cached fastest endpoint unusable, re-probing");
                }
            }
        }

        let urls = self.whitelist.urls_for(chain_id);
        if urls.is_empty() {
            return Vec::new();
        }

        let probe = self.join_or_start_probe(chain_id, urls.to_vec());
        let probe_map = probe.await;
        rank(&probe_map)
    }

    /// Joins the chain's in-flight probe round, or starts one.
    ///
    /// The round runs in a detached task so that a caller abandoning its
    /// wait never cancels the probe for everyone else. The task writes
    /// the cache (including an all-failed round, recorded with
    /// `fastest_url = None`) and deregisters itself before resolving.
    fn join_or_start_probe(self: &Arc<Self>, chain_id: ChainId, urls: Vec<String>) -> SharedProbe {
        let mut in_flight = self.in_flight.lock();
        if let Some(existing) = in_flight.get(&chain_id) {
            debug!(chain_id, "joining in-flight probe");
            return existing.clone();
        }

        info!(chain_id, endpoints = urls.len(), "starting probe round");
        let selector = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let probe_map = selector.prober.probe_all(&urls).await;
            let fastest = rank(&probe_map).into_iter().next();
            selector.cache.put(chain_id, probe_map.clone(), fastest);
            selector.in_flight.lock().remove(&chain_id);
            probe_map
        });

        // A panicked probe task resolves waiters with an empty map.
        let shared: SharedProbe = async move { handle.await.unwrap_or_default() }.boxed().shared();
        in_flight.insert(chain_id, shared.clone());
        shared
    }

    /// The cache this selector writes through. Exposed for hosts that
    /// report cache mode in health output.
    #[must_use]
    pub fn cache(&self) -> &SelectionCache {
        &self.cache
    }

    /// The whitelist backing this selector.
    #[must_use]
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }
}
