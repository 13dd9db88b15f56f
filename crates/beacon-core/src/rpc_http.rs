//! Shared HTTP client for upstream JSON-RPC calls.
//!
//! Both the prober and the dispatcher issue their calls through
//! [`RpcHttpClient`], so connection pooling and TLS configuration live in
//! one place and error classification is identical on both paths.

use crate::types::JsonRpcRequest;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Outcome classification of one upstream JSON-RPC call.
#[derive(Error, Debug)]
pub enum CallError {
    /// The per-call deadline elapsed.
    #[error("deadline elapsed")]
    Timeout,

    /// Transport failure before an HTTP status was received.
    #[error("{0}")]
    Network(String),

    /// Non-2xx HTTP status.
    #[error("HTTP {0}")]
    Http(u16),

    /// Response carried a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// Body was not a JSON-RPC response (unparseable, or neither
    /// `result` nor `error` present).
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Thin JSON-RPC wrapper around a pooled [`reqwest::Client`].
#[derive(Clone)]
pub struct RpcHttpClient {
    client: Client,
}

/// Collapses transport errors into short log-safe strings. Raw reqwest
/// messages can embed resolved addresses and full URLs.
fn sanitize_network_error(error: &reqwest::Error) -> String {
    if error.is_connect() {
        "connection refused or unreachable".to_string()
    } else if error.is_request() {
        "request failed".to_string()
    } else if error.is_body() || error.is_decode() {
        "response body error".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else {
        "network error".to_string()
    }
}

impl RpcHttpClient {
    /// Builds the pooled client. Fails only if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, CallError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .connect_timeout(Duration::from_secs(5))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("beacon/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CallError::Network(format!("HTTP client build failed: {e}")))?;
        Ok(Self { client })
    }

    /// Issues one JSON-RPC 2.0 call and returns the `result` value.
    ///
    /// `result` may be JSON `null`; presence of the field, not its value,
    /// decides success. The deadline covers the whole call including body
    /// download.
    ///
    /// # Errors
    ///
    /// See [`CallError`] for the classification. Exactly one variant
    /// matches any failure, in the order: timeout, network, HTTP status,
    /// RPC error object, malformed body.
    pub async fn call(
        &self,
        url: &str,
        method: &str,
        params: &Value,
        id: &str,
        timeout: Duration,
    ) -> Result<Value, CallError> {
        let request =
            JsonRpcRequest::new(method, Some(params.clone()), Value::String(id.to_string()));

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallError::Timeout
                } else {
                    CallError::Network(sanitize_network_error(&e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Http(status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CallError::Timeout
            } else if e.is_decode() {
                CallError::Malformed("body is not valid JSON".to_string())
            } else {
                CallError::Network(sanitize_network_error(&e))
            }
        })?;

        if let Some(error) = payload.get("error") {
            let code = error
                .get("code")
                .and_then(Value::as_i64)
                .and_then(|c| i32::try_from(c).ok())
                .unwrap_or(-32603);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown upstream error")
                .to_string();
            return Err(CallError::Rpc { code, message });
        }

        match payload.get("result") {
            Some(result) => Ok(result.clone()),
            None => Err(CallError::Malformed(
                "response carries neither result nor error".to_string(),
            )),
        }
    }
}
