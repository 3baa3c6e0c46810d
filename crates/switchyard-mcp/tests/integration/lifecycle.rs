//! Health loop and graceful shutdown.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use switchyard_client::{BackendClient, TransportError};
use switchyard_mcp::{
    HandlerError, HealthCheck, LoopPhase, ProtocolServer, ServerConfig, ToolRegistry, ToolRequest,
};

use crate::common::{TestServer, params, test_registry};

/// Call `echo` with a fresh client until the connection is refused.
async fn wait_for_refusal(endpoint: &str) -> TransportError {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let fresh = BackendClient::new().unwrap();
        let outcome = fresh
            .call_tool(
                endpoint,
                &ToolRequest::new("echo", params(json!({}))),
                Duration::from_millis(500),
            )
            .await;
        match outcome {
            Err(e @ TransportError::Connect { .. }) => return e,
            other => assert!(
                Instant::now() < deadline,
                "still accepting after shutdown: {other:?}"
            ),
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Alternates healthy / unhealthy, starting healthy.
struct Alternating {
    calls: AtomicU32,
}

#[async_trait]
impl HealthCheck for Alternating {
    async fn check(&self) -> Result<bool, HandlerError> {
        Ok(self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0)
    }
}

#[tokio::test(start_paused = true)]
async fn test_health_tracks_most_recent_cycle() {
    let config = ServerConfig::new("flip").with_health_check_interval(Duration::from_secs(5));
    let server = ProtocolServer::new(config, ToolRegistry::new())
        .unwrap()
        .with_health_check(Arc::new(Alternating {
            calls: AtomicU32::new(0),
        }));
    let mut state = server.subscribe_state();

    server.start().unwrap();
    for cycle in 1..=6_u64 {
        let seen = *state.wait_for(|s| s.cycles >= cycle).await.unwrap();
        let expected = cycle % 2 == 1;
        assert_eq!(seen.last_result, Some(expected));
        assert_eq!(server.is_healthy(), expected);
        assert_eq!(server.health_report().is_healthy(), expected);
        assert!(server.is_running(), "loop must keep running");
    }
    assert!(server.stats().last_health_check.is_some());

    server.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_state_changes_after_stop() {
    let config = ServerConfig::new("quiet").with_health_check_interval(Duration::from_secs(1));
    let server = ProtocolServer::new(config, ToolRegistry::new())
        .unwrap()
        .with_health_check(Arc::new(Alternating {
            calls: AtomicU32::new(0),
        }));
    let mut state = server.subscribe_state();

    server.start().unwrap();
    state.wait_for(|s| s.cycles >= 2).await.unwrap();
    server.stop().await;

    assert!(!server.is_running());
    let frozen = server.loop_state();
    assert_eq!(frozen.phase, LoopPhase::Stopped);
    let healthy = server.is_healthy();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(server.loop_state(), frozen);
    assert_eq!(server.is_healthy(), healthy);
}

#[tokio::test]
async fn test_shutdown_stops_health_loop() {
    let harness = TestServer::with_config(ServerConfig::new("drain")).await;
    let server = Arc::clone(&harness.server);
    assert!(server.is_running());

    harness.shutdown().await.unwrap();
    assert!(!server.is_running());
    assert_eq!(server.loop_state().phase, LoopPhase::Stopped);
}

#[tokio::test]
async fn test_in_flight_request_finishes_within_grace() {
    let config = ServerConfig::new("graceful").with_shutdown_grace(Duration::from_secs(5));
    let harness = TestServer::with_config(config).await;
    let endpoint = harness.endpoint();
    let client = BackendClient::new().unwrap();

    let in_flight = tokio::spawn(async move {
        client
            .call_tool(
                &endpoint,
                &ToolRequest::new("sleep", params(json!({"millis": 300}))),
                Duration::from_secs(5),
            )
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    harness.begin_shutdown();
    let response = in_flight.await.unwrap().unwrap();
    assert!(response.is_success());
    assert_eq!(response.result(), Some(&json!({"slept": 300})));

    harness.join().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_refuses_new_connections_while_draining() {
    let config = ServerConfig::new("draining").with_shutdown_grace(Duration::from_secs(5));
    let harness = TestServer::with_config(config).await;
    let endpoint = harness.endpoint();
    let client = BackendClient::new().unwrap();

    let slow_endpoint = endpoint.clone();
    let in_flight = tokio::spawn(async move {
        client
            .call_tool(
                &slow_endpoint,
                &ToolRequest::new("sleep", params(json!({"millis": 1500}))),
                Duration::from_secs(5),
            )
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    harness.begin_shutdown();
    let refused = wait_for_refusal(&endpoint).await;
    assert!(refused.is_unreachable());
    assert!(!in_flight.is_finished(), "slow call should still be draining");

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.result(), Some(&json!({"slept": 1500})));
    harness.join().await.unwrap();
}

#[tokio::test]
async fn test_grace_period_bounds_shutdown() {
    let config = ServerConfig::new("impatient").with_shutdown_grace(Duration::from_millis(200));
    let harness = TestServer::spawn(ProtocolServer::new(config, test_registry()).unwrap()).await;
    let endpoint = harness.endpoint();
    let client = BackendClient::new().unwrap();

    let _stuck = tokio::spawn(async move {
        client
            .call_tool(
                &endpoint,
                &ToolRequest::new("sleep", params(json!({"millis": 30_000}))),
                Duration::from_secs(60),
            )
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    harness.shutdown().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}
