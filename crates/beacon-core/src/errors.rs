//! Error taxonomy for the selection and dispatch engine.

use crate::types::ChainId;
use thiserror::Error;

/// Errors surfaced by [`crate::gateway::RpcGateway::send`] and the
/// components beneath it.
///
/// The per-attempt variants (`Timeout`, `Http`, `Rpc`, `Network`,
/// `MalformedResponse`) describe a single upstream call; the fallback
/// loop absorbs them until the ranked list is exhausted, at which point
/// the most recent one is wrapped in `AllEndpointsFailed`.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The whitelist is empty for this chain, or every endpoint probed as
    /// a hard failure.
    #[error("no usable RPC endpoints for chain {0}")]
    NoEndpoints(ChainId),

    /// Every ranked endpoint was attempted once and all failed.
    #[error("all RPC endpoints failed for chain {chain_id}: {last_error}")]
    AllEndpointsFailed {
        chain_id: ChainId,
        #[source]
        last_error: Box<GatewayError>,
    },

    /// The per-request deadline elapsed.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// Upstream answered with a non-2xx HTTP status.
    #[error("upstream returned HTTP {0}")]
    Http(u16),

    /// Upstream returned a JSON-RPC error object.
    #[error("upstream RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// Transport-level failure before any HTTP status was received.
    #[error("network error: {0}")]
    Network(String),

    /// Body parsed as JSON but carries neither `result` nor `error`.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Whether this error describes one failed upstream attempt, as
    /// opposed to a terminal selection outcome.
    #[must_use]
    pub fn is_attempt_error(&self) -> bool {
        !matches!(self, Self::NoEndpoints(_) | Self::AllEndpointsFailed { .. })
    }
}

/// Failure of the pluggable key-value store backing the selection cache.
///
/// Never propagated to gateway callers: reads degrade to a cache miss and
/// writes are dropped, both with a log line.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),

    #[error("store write failed: {0}")]
    Write(String),

    #[error("stored value is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}
