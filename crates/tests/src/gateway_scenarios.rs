//! End-to-end gateway behavior against fleets of mock upstreams.

use crate::mock_infrastructure::{gateway_for, test_config, MockUpstream};
use beacon_core::{
    cache::{MemoryStore, SelectionCache},
    types::{ProbeResult, ProbeStatus},
    whitelist::Whitelist,
    GatewayError, RpcGatewayBuilder,
};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn test_happy_path_returns_upstream_result() {
    let mut upstream = MockUpstream::new().await;
    upstream.mock_healthy_probe(1).mock_method("eth_chainId", &json!("0x64"), 1);

    let gateway = gateway_for(100, vec![upstream.url()]);
    let result = gateway.send(100, "eth_chainId", &json!([])).await.unwrap();

    assert_eq!(result, json!("0x64"));
    upstream.assert();
}

#[tokio::test]
async fn test_synced_endpoint_ranks_before_syncing_one() {
    let mut synced = MockUpstream::new().await;
    synced.mock_healthy_probe(1).mock_method("eth_chainId", &json!("0x64"), 1);
    let mut catching_up = MockUpstream::new().await;
    catching_up.mock_syncing_probe(1);

    // The syncing node is listed first in the whitelist; ranking must
    // still prefer the synced one.
    let gateway = gateway_for(100, vec![catching_up.url(), synced.url()]);

    let ranking = gateway.ranked_list(100).await;
    assert_eq!(ranking, vec![synced.url(), catching_up.url()]);

    let result = gateway.send(100, "eth_chainId", &json!([])).await.unwrap();
    assert_eq!(result, json!("0x64"));
    synced.assert();
    catching_up.assert();
}

#[tokio::test]
async fn test_round_robin_rotates_start_across_sends() {
    let mut first = MockUpstream::new().await;
    first.mock_healthy_probe(1).mock_method("eth_chainId", &json!("0x64"), 2);
    let mut second = MockUpstream::new().await;
    second.mock_syncing_probe(1).mock_method("eth_chainId", &json!("0x64"), 2);

    let gateway = gateway_for(100, vec![first.url(), second.url()]);

    // Four back-to-back sends over two ranked endpoints alternate
    // starting positions, so each endpoint serves exactly two.
    for _ in 0..4 {
        let result = gateway.send(100, "eth_chainId", &json!([])).await.unwrap();
        assert_eq!(result, json!("0x64"));
    }

    first.assert();
    second.assert();
}

#[tokio::test]
async fn test_fallback_when_primary_fails_at_call_time() {
    let mut primary = MockUpstream::new().await;
    primary.mock_healthy_probe(1).mock_method_http_error("eth_chainId", 500, 1);
    let mut fallback = MockUpstream::new().await;
    fallback.mock_syncing_probe(1).mock_method("eth_chainId", &json!("0x64"), 1);

    let gateway = gateway_for(100, vec![primary.url(), fallback.url()]);
    let result = gateway.send(100, "eth_chainId", &json!([])).await.unwrap();

    assert_eq!(result, json!("0x64"));
    primary.assert();
    fallback.assert();
}

#[tokio::test]
async fn test_all_attempts_failing_reports_last_error() {
    let mut first = MockUpstream::new().await;
    first.mock_healthy_probe(1).mock_rpc_error("eth_call", -32601, "method not found", 1);
    let mut second = MockUpstream::new().await;
    second.mock_syncing_probe(1).mock_rpc_error("eth_call", -32601, "method not found", 1);

    let gateway = gateway_for(100, vec![first.url(), second.url()]);
    let error = gateway.send(100, "eth_call", &json!([])).await.unwrap_err();

    match error {
        GatewayError::AllEndpointsFailed { chain_id, last_error } => {
            assert_eq!(chain_id, 100);
            assert!(
                matches!(*last_error, GatewayError::Rpc { code: -32601, .. }),
                "unexpected last error: {last_error:?}"
            );
        }
        other => panic!("expected AllEndpointsFailed, got {other:?}"),
    }
    first.assert();
    second.assert();
}

#[tokio::test]
async fn test_all_probes_failing_records_empty_selection() {
    let mut upstreams = Vec::new();
    for _ in 0..3 {
        let mut upstream = MockUpstream::new().await;
        // Two probe calls per endpoint, and only in the first round.
        upstream.mock_hard_failure(500, 2);
        upstreams.push(upstream);
    }
    let urls: Vec<String> = upstreams.iter().map(MockUpstream::url).collect();

    let gateway = gateway_for(100, urls);

    assert!(gateway.ranked_list(100).await.is_empty());
    let error = gateway.send(100, "eth_chainId", &json!([])).await.unwrap_err();
    assert!(matches!(error, GatewayError::NoEndpoints(100)));

    // The failed round is cached: a second call must not re-probe.
    let error = gateway.send(100, "eth_chainId", &json!([])).await.unwrap_err();
    assert!(matches!(error, GatewayError::NoEndpoints(100)));

    for upstream in &upstreams {
        upstream.assert();
    }
}

#[tokio::test]
async fn test_stale_fastest_endpoint_triggers_reprobe() {
    let mut upstream = MockUpstream::new().await;
    upstream.mock_healthy_probe(1).mock_method("eth_chainId", &json!("0x64"), 1);

    let config = test_config();
    let store = Arc::new(MemoryStore::new());

    // Seed a fresh cache entry whose recorded fastest endpoint has
    // degraded to a hard failure, as if probed before an outage.
    let seed = SelectionCache::new(
        store.clone(),
        config.gateway.cache_key.clone(),
        config.cache_ttl(),
        false,
    );
    let mut probe_map = beacon_core::types::ProbeMap::new();
    probe_map.insert(
        upstream.url(),
        ProbeResult::failed(&upstream.url(), ProbeStatus::HttpError, "HTTP 503"),
    );
    seed.put(100, probe_map, Some(upstream.url()));

    let gateway = RpcGatewayBuilder::new(config)
        .store(store)
        .whitelist(Whitelist::from_entries([(100, vec![upstream.url()])]))
        .build()
        .unwrap();

    let result = gateway.send(100, "eth_chainId", &json!([])).await.unwrap();
    assert_eq!(result, json!("0x64"));
    upstream.assert();
}

#[tokio::test]
async fn test_wrong_bytecode_endpoint_remains_usable() {
    let mut upstream = MockUpstream::new().await;
    upstream
        .mock_foreign_bytecode_probe(1)
        .mock_method("eth_chainId", &json!("0x64"), 1);

    let gateway = gateway_for(100, vec![upstream.url()]);

    assert_eq!(gateway.ranked_list(100).await, vec![upstream.url()]);
    let result = gateway.send(100, "eth_chainId", &json!([])).await.unwrap();
    assert_eq!(result, json!("0x64"));
    upstream.assert();
}

#[tokio::test]
async fn test_null_result_passes_through_unchanged() {
    let mut upstream = MockUpstream::new().await;
    upstream.mock_healthy_probe(1).mock_method("eth_getTransactionByHash", &Value::Null, 1);

    let gateway = gateway_for(100, vec![upstream.url()]);
    let result = gateway
        .send(100, "eth_getTransactionByHash", &json!(["0xdeadbeef"]))
        .await
        .unwrap();

    assert_eq!(result, Value::Null);
    upstream.assert();
}

#[tokio::test]
async fn test_empty_whitelist_is_no_endpoints() {
    let gateway = gateway_for(100, Vec::new());
    let error = gateway.send(100, "eth_chainId", &json!([])).await.unwrap_err();
    assert!(matches!(error, GatewayError::NoEndpoints(100)));
}
