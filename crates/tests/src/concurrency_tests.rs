//! Concurrency behavior: single-flight probing, cache-disabled
//! re-probing, and round-robin distribution under concurrent load.

use crate::mock_infrastructure::{gateway_for, gateway_with_config, test_config, MockUpstream};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_cold_chain_burst_probes_exactly_once() {
    let mut upstream = MockUpstream::new().await;
    upstream.mock_healthy_probe(1).mock_method("eth_chainId", &json!("0x64"), 50);

    let gateway = Arc::new(gateway_for(100, vec![upstream.url()]));

    let calls = (0..50).map(|_| {
        let gateway = Arc::clone(&gateway);
        async move { gateway.send(100, "eth_chainId", &json!([])).await }
    });
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap(), json!("0x64"));
    }
    // One probe round despite 50 concurrent cold-chain callers.
    upstream.assert();
}

#[tokio::test]
async fn test_concurrent_ranked_list_callers_share_one_probe() {
    let mut upstream = MockUpstream::new().await;
    upstream.mock_healthy_probe(1);

    let gateway = Arc::new(gateway_for(100, vec![upstream.url()]));

    let calls = (0..20).map(|_| {
        let gateway = Arc::clone(&gateway);
        async move { gateway.ranked_list(100).await }
    });
    let rankings = futures::future::join_all(calls).await;

    for ranking in &rankings {
        assert_eq!(ranking, &vec![upstream.url()]);
    }
    upstream.assert();
}

#[tokio::test]
async fn test_disabled_cache_runs_independent_probes() {
    let mut upstream = MockUpstream::new().await;
    upstream.mock_healthy_probe(2).mock_method("eth_chainId", &json!("0x64"), 2);

    let mut config = test_config();
    config.gateway.disable_cache = true;
    let gateway = gateway_with_config(config, 100, vec![upstream.url()]);

    gateway.send(100, "eth_chainId", &json!([])).await.unwrap();
    gateway.send(100, "eth_chainId", &json!([])).await.unwrap();

    upstream.assert();
}

#[tokio::test]
async fn test_concurrent_sends_start_at_distinct_endpoints() {
    let mut first = MockUpstream::new().await;
    first.mock_healthy_probe(1).mock_method("eth_chainId", &json!("0x64"), 1);
    let mut second = MockUpstream::new().await;
    second.mock_syncing_probe(1).mock_method("eth_chainId", &json!("0x64"), 1);

    let gateway = Arc::new(gateway_for(100, vec![first.url(), second.url()]));

    let params = json!([]);
    let (a, b) = tokio::join!(
        gateway.send(100, "eth_chainId", &params),
        gateway.send(100, "eth_chainId", &params),
    );
    assert_eq!(a.unwrap(), json!("0x64"));
    assert_eq!(b.unwrap(), json!("0x64"));

    // Two concurrent calls over two ranked endpoints claim distinct
    // starting offsets, so each endpoint serves exactly one.
    first.assert();
    second.assert();
}

#[tokio::test]
async fn test_chains_probe_independently() {
    let mut chain_a = MockUpstream::new().await;
    chain_a.mock_healthy_probe(1).mock_method("eth_chainId", &json!("0x1"), 1);
    let mut chain_b = MockUpstream::new().await;
    chain_b.mock_healthy_probe(1).mock_method("eth_chainId", &json!("0x64"), 1);

    let config = test_config();
    let gateway = Arc::new(
        beacon_core::RpcGatewayBuilder::new(config)
            .whitelist(beacon_core::whitelist::Whitelist::from_entries([
                (1, vec![chain_a.url()]),
                (100, vec![chain_b.url()]),
            ]))
            .build()
            .unwrap(),
    );

    let params = json!([]);
    let (a, b) = tokio::join!(
        gateway.send(1, "eth_chainId", &params),
        gateway.send(100, "eth_chainId", &params),
    );
    assert_eq!(a.unwrap(), json!("0x1"));
    assert_eq!(b.unwrap(), json!("0x64"));

    chain_a.assert();
    chain_b.assert();
}
