//! Endpoint liveness and capability probing.
//!
//! A probe issues two JSON-RPC calls to each candidate URL under one
//! deadline: `eth_getCode` on the Permit2 witness address and
//! `eth_syncing`. The pair classifies the endpoint into a
//! [`ProbeStatus`] and, when the endpoint answered at all, measures its
//! latency. Probes across URLs run fully in parallel and never abort one
//! another.

pub mod witness;

use crate::{
    rpc_http::{CallError, RpcHttpClient},
    types::{unix_ms, ProbeMap, ProbeResult, ProbeStatus},
};
use futures::future::join_all;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

pub use witness::WITNESS_ADDRESS;

/// Probes candidate URLs and classifies each into a [`ProbeResult`].
#[derive(Clone)]
pub struct Prober {
    http: RpcHttpClient,
    timeout: Duration,
}

impl Prober {
    #[must_use]
    pub fn new(http: RpcHttpClient, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Probes every URL concurrently and collects all outcomes.
    ///
    /// This is a settled join: a failure on one URL is recorded in its
    /// own [`ProbeResult`] and never short-circuits the rest.
    pub async fn probe_all(&self, urls: &[String]) -> ProbeMap {
        let outcomes = join_all(urls.iter().map(|url| self.probe_one(url))).await;
        outcomes.into_iter().map(|result| (result.url.clone(), result)).collect()
    }

    /// Runs the two witness calls against one URL and classifies the pair.
    ///
    /// Both calls start from a common timestamp and share the stopwatch;
    /// latency is read after both have settled.
    async fn probe_one(&self, url: &str) -> ProbeResult {
        let stamp = unix_ms();
        let started = Instant::now();

        let code_params = json!([WITNESS_ADDRESS, "latest"]);
        let code_id = format!("latency-test-eth_getCode-{stamp}");
        let code_call = self.http.call(
            url,
            "eth_getCode",
            &code_params,
            &code_id,
            self.timeout,
        );
        let syncing_params = json!([]);
        let syncing_id = format!("latency-test-eth_syncing-{stamp}");
        let syncing_call = self.http.call(
            url,
            "eth_syncing",
            &syncing_params,
            &syncing_id,
            self.timeout,
        );
        let (code, syncing) = tokio::join!(code_call, syncing_call);

        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = started.elapsed().as_millis() as u64;

        let result = classify(url, &code, &syncing, latency_ms);
        debug!(
            url = %url,
            status = %result.status,
            latency_ms = result.latency_ms,
            "endpoint probed"
        );
        result
    }
}

/// Hard-failure status for one call error.
fn failure_status(error: &CallError) -> ProbeStatus {
    match error {
        CallError::Timeout => ProbeStatus::Timeout,
        CallError::Network(_) => ProbeStatus::NetworkError,
        CallError::Http(_) => ProbeStatus::HttpError,
        CallError::Rpc { .. } | CallError::Malformed(_) => ProbeStatus::RpcError,
    }
}

/// Classification priority among hard failures: a timeout on either call
/// wins over a network error, which wins over an HTTP status, which wins
/// over an RPC-level error.
fn failure_priority(status: ProbeStatus) -> u8 {
    match status {
        ProbeStatus::Timeout => 0,
        ProbeStatus::NetworkError => 1,
        ProbeStatus::HttpError => 2,
        _ => 3,
    }
}

/// Deterministic classification of the call pair, first matching rule wins:
/// hard failure on either call, then sync state, then bytecode check.
fn classify(
    url: &str,
    code: &Result<Value, CallError>,
    syncing: &Result<Value, CallError>,
    latency_ms: u64,
) -> ProbeResult {
    if let (Ok(code_value), Ok(syncing_value)) = (code, syncing) {
        if *syncing_value != Value::Bool(false) {
            return ProbeResult::measured(url, ProbeStatus::Syncing, latency_ms);
        }
        let Some(code_hex) = code_value.as_str() else {
            return ProbeResult::measured(url, ProbeStatus::WrongBytecode, latency_ms);
        };
        if !witness::matches_witness(code_hex) {
            return ProbeResult::measured(url, ProbeStatus::WrongBytecode, latency_ms);
        }
        return ProbeResult::measured(url, ProbeStatus::Ok, latency_ms);
    }

    let (status, text) = [code.as_ref().err(), syncing.as_ref().err()]
        .into_iter()
        .flatten()
        .map(|e| (failure_status(e), e.to_string()))
        .min_by_key(|(status, _)| failure_priority(*status))
        .unwrap_or((ProbeStatus::NetworkError, String::new()));
    ProbeResult::failed(url, status, text)
}
