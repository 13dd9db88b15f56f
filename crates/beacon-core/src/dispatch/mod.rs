//! Request dispatch with round-robin start and iterative failover.
//!
//! A dispatched call freezes the selector's ranked list, picks a starting
//! offset from the chain's rotating counter, and walks the ring once.
//! Each endpoint is attempted at most one time; the first success wins
//! and the last failure becomes the terminal error when the ring is
//! exhausted.

use crate::{
    errors::GatewayError,
    rpc_http::{CallError, RpcHttpClient},
    selector::Selector,
    types::{unix_ms, ChainId},
};
use dashmap::DashMap;
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, warn};

/// Executes JSON-RPC calls against the best available upstream.
pub struct Dispatcher {
    selector: Arc<Selector>,
    http: RpcHttpClient,
    request_timeout: Duration,
    /// Per-chain rotating counters; process-local, never persisted.
    round_robin: DashMap<ChainId, AtomicUsize>,
}

fn map_call_error(error: CallError, timeout: Duration) -> GatewayError {
    match error {
        #[allow(clippy::cast_possible_truncation)]
        CallError::Timeout => GatewayError::Timeout(timeout.as_millis() as u64),
        CallError::Network(message) => GatewayError::Network(message),
        CallError::Http(status) => GatewayError::Http(status),
        CallError::Rpc { code, message } => GatewayError::Rpc { code, message },
        CallError::Malformed(message) => GatewayError::MalformedResponse(message),
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(selector: Arc<Selector>, http: RpcHttpClient, request_timeout: Duration) -> Self {
        Self { selector, http, request_timeout, round_robin: DashMap::new() }
    }

    /// Sends one JSON-RPC call, failing over through the ranked list.
    ///
    /// The chain's counter advances exactly once per call, before the
    /// first attempt, so concurrent callers start at distinct offsets
    /// whenever more than one endpoint is ranked. The returned value is
    /// the upstream's `result` verbatim, JSON `null` included.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NoEndpoints`] when the ranked list is empty,
    /// [`GatewayError::AllEndpointsFailed`] when every endpoint was
    /// attempted once and none succeeded.
    pub async fn send(
        &self,
        chain_id: ChainId,
        method: &str,
        params: &Value,
    ) -> Result<Value, GatewayError> {
        let list = self.selector.ranked_list(chain_id).await;
        if list.is_empty() {
            return Err(GatewayError::NoEndpoints(chain_id));
        }

        let n = list.len();
        let start = self.next_start_index(chain_id) % n;
        debug!(chain_id, method, endpoints = n, start, "dispatching call");

        let mut last_error: Option<GatewayError> = None;
        for k in 0..n {
            let url = &list[(start + k) % n];
            match self.execute_one(url, method, params).await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    warn!(chain_id, method, url = %url, error = %error, "endpoint attempt failed");
                    last_error = Some(error);
                }
            }
        }

        Err(GatewayError::AllEndpointsFailed {
            chain_id,
            last_error: Box::new(last_error.unwrap_or(GatewayError::NoEndpoints(chain_id))),
        })
    }

    /// One attempt against one endpoint under the request deadline.
    async fn execute_one(
        &self,
        url: &str,
        method: &str,
        params: &Value,
    ) -> Result<Value, GatewayError> {
        let id = format!("rpc-call-{}", unix_ms());
        self.http
            .call(url, method, params, &id, self.request_timeout)
            .await
            .map_err(|e| map_call_error(e, self.request_timeout))
    }

    /// Atomically claims and advances the chain's rotating counter.
    fn next_start_index(&self, chain_id: ChainId) -> usize {
        self.round_robin
            .entry(chain_id)
            .or_default()
            .fetch_add(1, Ordering::Relaxed)
    }
}
