//! Tool calls over HTTP.

use serde_json::json;
use std::time::Duration;
use switchyard_client::BackendClient;
use switchyard_mcp::{ServerConfig, ToolRequest};

use crate::common::{TestServer, params};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_echo_round_trip() {
    let harness = TestServer::with_config(ServerConfig::new("echo-server")).await;
    let client = BackendClient::new().unwrap();

    let response = client
        .call_tool(
            &harness.endpoint(),
            &ToolRequest::new("echo", params(json!({"msg": "hi"}))),
            TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"success": true, "result": {"msg": "hi"}, "metadata": {"tool_name": "echo"}})
    );
    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_counters_over_http() {
    let harness = TestServer::with_config(ServerConfig::new("counted")).await;
    let client = BackendClient::new().unwrap();
    let endpoint = harness.endpoint();

    let failed = client
        .call_tool(&endpoint, &ToolRequest::new("fail", params(json!({}))), TIMEOUT)
        .await
        .unwrap();
    assert!(!failed.is_success());
    assert_eq!(failed.error(), Some("backend offline"));

    let missing = client
        .call_tool(&endpoint, &ToolRequest::new("nope", params(json!({}))), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(missing.error(), Some("tool 'nope' not found"));

    let ok = client
        .call_tool(&endpoint, &ToolRequest::new("echo", params(json!({}))), TIMEOUT)
        .await
        .unwrap();
    assert!(ok.is_success());

    // Built-ins leave the counters alone
    let health = client
        .call_tool(&endpoint, &ToolRequest::new("health", params(json!({}))), TIMEOUT)
        .await
        .unwrap();
    let health = health.result().unwrap();
    assert_eq!(health["request_count"], 3);
    assert_eq!(health["error_count"], 1);

    let stats = harness.server.stats();
    assert_eq!(stats.request_count, 3);
    assert_eq!(stats.error_count, 1);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_listing_and_probe() {
    let harness = TestServer::with_config(ServerConfig::new("listed").with_port(7000)).await;
    let client = BackendClient::new().unwrap();
    let endpoint = harness.endpoint();

    let tools = client.list_tools(&endpoint, TIMEOUT).await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "fail", "sleep", "health", "metrics"]);

    let probe = client.probe_health(&endpoint, TIMEOUT).await.unwrap();
    assert_eq!(probe.status, 200);
    let payload = probe.payload.unwrap();
    assert_eq!(payload["status"], "healthy");
    assert_eq!(payload["port"], 7000);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let harness = TestServer::with_config(ServerConfig::new("busy")).await;
    let client = BackendClient::new().unwrap();
    let endpoint = harness.endpoint();

    let calls = (0..8).map(|i| {
        let client = client.clone();
        let endpoint = endpoint.clone();
        async move {
            let tool = if i % 2 == 0 { "echo" } else { "fail" };
            client
                .call_tool(&endpoint, &ToolRequest::new(tool, params(json!({"i": i}))), TIMEOUT)
                .await
                .unwrap()
        }
    });
    let responses = futures::future::join_all(calls).await;

    for (i, response) in responses.iter().enumerate() {
        assert_eq!(response.is_success(), i % 2 == 0);
    }
    assert_eq!(harness.server.stats().request_count, 8);
    assert_eq!(harness.server.stats().error_count, 4);

    harness.shutdown().await.unwrap();
}
