//! Mockito-backed fake EVM JSON-RPC upstream.
//!
//! Wraps mockito with helpers for the witness-probe protocol
//! (`eth_getCode` on the Permit2 address plus `eth_syncing`) and for
//! per-method dispatch responses, so tests read as endpoint behavior
//! rather than matcher plumbing.

use beacon_core::probe::witness;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// One fake upstream endpoint.
pub struct MockUpstream {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

fn method_matcher(method: &str) -> Matcher {
    Matcher::Regex(format!(r#""method":"{method}""#))
}

fn rpc_body(result: &Value) -> String {
    json!({"jsonrpc": "2.0", "id": "1", "result": result}).to_string()
}

impl MockUpstream {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Base URL of this fake endpoint.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Answers both probe calls like a synced node hosting the witness
    /// contract. `expected_rounds` pins how many probe rounds may hit
    /// this endpoint; [`MockUpstream::assert`] verifies the count.
    pub fn mock_healthy_probe(&mut self, expected_rounds: usize) -> &mut Self {
        let code = Value::String(format!("0x{}", witness::witness_bytecode_hex()));
        self.mock_probe_responses(&code, &Value::Bool(false), expected_rounds)
    }

    /// Answers probes like a node that is still catching up.
    pub fn mock_syncing_probe(&mut self, expected_rounds: usize) -> &mut Self {
        let code = Value::String(format!("0x{}", witness::witness_bytecode_hex()));
        let state = json!({"currentBlock": "0x1", "highestBlock": "0x64"});
        self.mock_probe_responses(&code, &state, expected_rounds)
    }

    /// Answers probes like a synced node hosting some other contract.
    pub fn mock_foreign_bytecode_probe(&mut self, expected_rounds: usize) -> &mut Self {
        self.mock_probe_responses(
            &Value::String("0x6080604052".to_string()),
            &Value::Bool(false),
            expected_rounds,
        )
    }

    fn mock_probe_responses(
        &mut self,
        code: &Value,
        syncing: &Value,
        expected_rounds: usize,
    ) -> &mut Self {
        let code_mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher("eth_getCode"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rpc_body(code))
            .expect(expected_rounds)
            .create();
        let syncing_mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher("eth_syncing"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rpc_body(syncing))
            .expect(expected_rounds)
            .create();
        self.mocks.push(code_mock);
        self.mocks.push(syncing_mock);
        self
    }

    /// Fails every request (probes included) with the given HTTP status.
    /// `expected_hits` counts individual HTTP requests, two per probe round.
    pub fn mock_hard_failure(&mut self, status: usize, expected_hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(status)
            .with_body("upstream exploded")
            .expect(expected_hits)
            .create();
        self.mocks.push(mock);
        self
    }

    /// Serves a fixed result for one dispatched method.
    pub fn mock_method(&mut self, method: &str, result: &Value, expected_hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rpc_body(result))
            .expect(expected_hits)
            .create();
        self.mocks.push(mock);
        self
    }

    /// Serves a JSON-RPC error object for one dispatched method.
    pub fn mock_rpc_error(
        &mut self,
        method: &str,
        code: i32,
        message: &str,
        expected_hits: usize,
    ) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": "1",
                    "error": {"code": code, "message": message}
                })
                .to_string(),
            )
            .expect(expected_hits)
            .create();
        self.mocks.push(mock);
        self
    }

    /// Fails one dispatched method with an HTTP status while probes keep
    /// working.
    pub fn mock_method_http_error(
        &mut self,
        method: &str,
        status: usize,
        expected_hits: usize,
    ) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(status)
            .expect(expected_hits)
            .create();
        self.mocks.push(mock);
        self
    }

    /// Verifies every registered expectation.
    pub fn assert(&self) {
        for mock in &self.mocks {
            mock.assert();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_upstream_url_is_http() {
        let upstream = MockUpstream::new().await;
        assert!(upstream.url().starts_with("http://"));
    }

    #[tokio::test]
    async fn test_probe_mocks_answer_both_methods() {
        let mut upstream = MockUpstream::new().await;
        upstream.mock_healthy_probe(1);

        let client = beacon_core::rpc_http::RpcHttpClient::new().unwrap();
        let timeout = std::time::Duration::from_secs(2);

        let code = client
            .call(&upstream.url(), "eth_getCode", &json!([]), "1", timeout)
            .await
            .unwrap();
        assert!(code.as_str().unwrap().starts_with("0x"));

        let syncing = client
            .call(&upstream.url(), "eth_syncing", &json!([]), "1", timeout)
            .await
            .unwrap();
        assert_eq!(syncing, Value::Bool(false));

        upstream.assert();
    }
}
