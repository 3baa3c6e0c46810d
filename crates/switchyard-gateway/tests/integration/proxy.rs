//! GatewayRouter against live backends.

use serde_json::json;
use std::time::Duration;
use switchyard_core::{Parameters, ToolRequest};

use crate::common::{McpBackend, Stub, closed_endpoint, directory, router};

fn request(tool: &str) -> ToolRequest {
    let mut params = Parameters::new();
    params.insert("msg".to_string(), json!("hi"));
    ToolRequest::new(tool, params)
}

#[tokio::test]
async fn test_success_passes_through_unchanged() {
    let backend = McpBackend::spawn("crm").await;
    let directory = directory(&[("crm", &backend.endpoint)]);

    let response = router(&directory)
        .proxy("crm", &request("echo"), Duration::from_secs(5))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"success": true, "result": {"msg": "hi"}, "metadata": {"tool_name": "echo"}})
    );
}

#[tokio::test]
async fn test_backend_failure_is_not_reinterpreted() {
    let backend = McpBackend::spawn("crm").await;
    let directory = directory(&[("crm", &backend.endpoint)]);

    let response = router(&directory)
        .proxy("crm", &request("fail"), Duration::from_secs(5))
        .await;
    assert!(!response.is_success());
    assert_eq!(response.error(), Some("backend offline"));
    assert!(response.metadata().get("server_name").is_none());
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let slow = Stub::delayed(Duration::from_secs(5)).spawn().await;
    let directory = directory(&[("slow", &slow)]);

    let response = router(&directory)
        .proxy("slow", &request("echo"), Duration::from_millis(200))
        .await;
    assert!(!response.is_success());
    assert_eq!(response.error(), Some("request timed out after 200ms"));
    assert_eq!(response.metadata()["server_name"], "slow");
    assert_eq!(response.metadata()["tool_name"], "echo");
}

#[tokio::test]
async fn test_connection_refused_is_classified() {
    let gone = closed_endpoint().await;
    let directory = directory(&[("gone", &gone)]);

    let response = router(&directory)
        .proxy("gone", &request("echo"), Duration::from_secs(2))
        .await;
    assert!(!response.is_success());
    assert!(response.error().unwrap().starts_with("connection failed"));
}

#[tokio::test]
async fn test_failures_are_isolated_per_request() {
    let backend = McpBackend::spawn("crm").await;
    let slow = Stub::delayed(Duration::from_secs(5)).spawn().await;
    let gone = closed_endpoint().await;
    let directory = directory(&[("crm", &backend.endpoint), ("slow", &slow), ("gone", &gone)]);
    let router = router(&directory);

    let timeout = Duration::from_millis(500);
    let req = request("echo");
    let (ok, slow, gone) = tokio::join!(
        router.proxy("crm", &req, timeout),
        router.proxy("slow", &req, timeout),
        router.proxy("gone", &req, timeout),
    );
    assert!(ok.is_success());
    assert!(!slow.is_success());
    assert!(!gone.is_success());

    // The shared client is still usable afterwards
    assert!(router.proxy("crm", &req, timeout).await.is_success());
}

#[tokio::test]
async fn test_list_tools_through_router() {
    let backend = McpBackend::spawn("crm").await;
    let directory = directory(&[("crm", &backend.endpoint)]);

    let tools = router(&directory)
        .list_tools("crm", Duration::from_secs(5))
        .await
        .unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "fail", "health", "metrics"]);
}
