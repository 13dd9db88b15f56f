//! Core type definitions: JSON-RPC envelope, probe results, and the
//! persisted per-chain selection cache.

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::BTreeMap, sync::Arc};

/// JSON-RPC protocol version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for the JSON-RPC version - zero allocation for static usage.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// EVM network identifier (e.g. `1` for mainnet, `100` for Gnosis).
pub type ChainId = u64;

/// JSON-RPC 2.0 request structure.
///
/// `id` is an `Arc<serde_json::Value>` so it can be echoed into the
/// response without cloning the underlying value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default = "default_request_id")]
    pub id: Arc<serde_json::Value>,
}

fn default_request_id() -> Arc<serde_json::Value> {
    Arc::new(serde_json::Value::Null)
}

impl JsonRpcRequest {
    #[must_use]
    pub fn new(method: &str, params: Option<serde_json::Value>, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            method: method.to_string(),
            params,
            id: Arc::new(id),
        }
    }
}

/// JSON-RPC 2.0 response structure.
///
/// A response carries either `result` or `error`, never both. `result`
/// may legitimately be JSON `null`, so presence of the field is tracked
/// separately from its value when classifying upstream bodies (see
/// [`crate::rpc_http`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Builds a success envelope echoing the request id.
    #[must_use]
    pub fn result(id: Arc<serde_json::Value>, result: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    /// Builds an error envelope echoing the request id.
    #[must_use]
    pub fn error(id: Arc<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
            id,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Outcome classification of a single endpoint probe.
///
/// The first three tags are usable for request dispatch, in that order of
/// preference; the rest are hard failures that exclude the endpoint until
/// the next probe round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Endpoint is synced and hosts the witness contract.
    Ok,
    /// Endpoint answered but `eth_getCode` did not match the witness bytecode.
    WrongBytecode,
    /// Endpoint reports an active sync (`eth_syncing` not `false`).
    Syncing,
    /// Probe deadline elapsed before both calls settled.
    Timeout,
    /// Non-2xx HTTP status on either probe call.
    HttpError,
    /// Either probe response carried a JSON-RPC error object.
    RpcError,
    /// Transport-level failure (DNS, TLS, connection refused).
    NetworkError,
}

impl ProbeStatus {
    /// Preference tier for dispatch, `0` being best. `None` means the
    /// endpoint is excluded from selection entirely.
    #[must_use]
    pub fn tier(self) -> Option<usize> {
        match self {
            Self::Ok => Some(0),
            Self::WrongBytecode => Some(1),
            Self::Syncing => Some(2),
            Self::Timeout | Self::HttpError | Self::RpcError | Self::NetworkError => None,
        }
    }

    /// Whether this status keeps the endpoint in the ranked list.
    #[must_use]
    pub fn is_acceptable(self) -> bool {
        self.tier().is_some()
    }

    /// Static string form, matching the serialized tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::WrongBytecode => "wrong_bytecode",
            Self::Syncing => "syncing",
            Self::Timeout => "timeout",
            Self::HttpError => "http_error",
            Self::RpcError => "rpc_error",
            Self::NetworkError => "network_error",
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of probing a single endpoint.
///
/// `latency_ms` is `None` for hard failures (the endpoint never produced
/// a usable answer, so there is no meaningful measurement); it serializes
/// as JSON `null`. Acceptable statuses always carry a measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub latency_ms: Option<u64>,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl ProbeResult {
    /// Builds a hard-failure result with no latency measurement.
    #[must_use]
    pub fn failed(url: &str, status: ProbeStatus, error_text: impl Into<String>) -> Self {
        debug_assert!(!status.is_acceptable());
        Self { url: url.to_string(), latency_ms: None, status, error_text: Some(error_text.into()) }
    }

    /// Builds a measured result for an endpoint that answered both calls.
    #[must_use]
    pub fn measured(url: &str, status: ProbeStatus, latency_ms: u64) -> Self {
        debug_assert!(status.is_acceptable());
        Self { url: url.to_string(), latency_ms: Some(latency_ms), status, error_text: None }
    }
}

/// Probe outcomes for every whitelisted endpoint of one chain.
///
/// A `BTreeMap` keeps iteration deterministic, so ranking tie-breaks are
/// stable across cache round-trips.
pub type ProbeMap = BTreeMap<String, ProbeResult>;

/// Per-chain entry of the persisted selection cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainCacheEntry {
    /// Unix epoch milliseconds of the probe round that produced this entry.
    pub last_tested_unix_ms: i64,
    pub probe_map: ProbeMap,
    /// Head of the ranking at probe time; `None` when no endpoint was usable.
    pub fastest_url: Option<String>,
}

/// Whole persisted cache: one entry per chain, stored as a single JSON
/// document under one KV key and always rewritten as a unit.
pub type CacheRoot = BTreeMap<ChainId, ChainCacheEntry>;

/// Current wall clock as Unix epoch milliseconds.
#[must_use]
pub fn unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
