//! Common test utilities for switchyard-gateway integration tests.
//!
//! Backends are real processes-in-miniature bound to loopback: either a
//! full `ProtocolServer` or a stub whose health endpoint can be slowed down
//! or made to fail.

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use switchyard_client::BackendClient;
use switchyard_core::Shutdown;
use switchyard_gateway::{GatewayConfig, GatewayRouter, HealthAggregator, ServerDirectory};
use switchyard_mcp::{HandlerError, ProtocolServer, ServerConfig, ToolDefinition, ToolRegistry};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A protocol server serving `echo` and `fail`, stopped on drop of its
/// shutdown trigger.
pub struct McpBackend {
    pub endpoint: String,
    shutdown: Shutdown,
}

impl McpBackend {
    pub async fn spawn(name: &str) -> Self {
        let registry = ToolRegistry::from_definitions(vec![
            ToolDefinition::from_fn("echo", "Echo input", json!({"type": "object"}), |p| {
                Ok(Value::Object(p))
            }),
            ToolDefinition::from_fn("fail", "Always fails", json!({}), |_p| {
                Err(HandlerError::new("backend offline"))
            }),
        ])
        .unwrap();
        let server = Arc::new(ProtocolServer::new(ServerConfig::new(name), registry).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        tokio::spawn(switchyard_mcp::serve(server, listener, async move {
            signal.wait().await
        }));
        Self { endpoint, shutdown }
    }
}

impl Drop for McpBackend {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Behaviour of a stub backend.
#[derive(Clone, Copy)]
pub struct Stub {
    pub delay: Duration,
    pub status: StatusCode,
}

impl Stub {
    pub fn healthy() -> Self {
        Self {
            delay: Duration::ZERO,
            status: StatusCode::OK,
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay,
            status: StatusCode::OK,
        }
    }

    pub fn failing(status: StatusCode) -> Self {
        Self {
            delay: Duration::ZERO,
            status,
        }
    }

    /// Serve the stub; returns its endpoint.
    pub async fn spawn(self) -> String {
        let app = Router::new()
            .route(
                "/health",
                get(move || async move {
                    tokio::time::sleep(self.delay).await;
                    (self.status, Json(json!({"status": "healthy"}))).into_response()
                }),
            )
            .route(
                "/tools/{name}",
                post(move || async move {
                    tokio::time::sleep(self.delay).await;
                    Json(json!({"success": true, "result": "slow", "metadata": {}}))
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        endpoint
    }
}

/// Endpoint of a port nothing listens on.
pub async fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    endpoint
}

/// Endpoint that accepts connections and never answers. The receiver
/// yields once for every connection the client side closes.
pub async fn hanging_endpoint() -> (String, mpsc::UnboundedReceiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let closed_tx = closed_tx.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                while matches!(stream.read(&mut buf).await, Ok(n) if n > 0) {}
                let _ = closed_tx.send(());
            });
        }
    });
    (endpoint, closed_rx)
}

/// Gateway configuration JSON for `(name, endpoint)` pairs, in order.
pub fn config_json(servers: &[(&str, &str)]) -> String {
    let entries: Vec<String> = servers
        .iter()
        .map(|(name, endpoint)| {
            format!(
                r#""{name}": {{"description": "{name} server", "capabilities": ["{name}"], "endpoint": "{endpoint}"}}"#
            )
        })
        .collect();
    format!(r#"{{"name": "test-gateway", "servers": {{{}}}}}"#, entries.join(","))
}

/// Directory over `(name, endpoint)` pairs, in order.
pub fn directory(servers: &[(&str, &str)]) -> Arc<ServerDirectory> {
    let config = GatewayConfig::from_json(&config_json(servers)).unwrap();
    Arc::new(ServerDirectory::load(&config).unwrap())
}

pub fn router(directory: &Arc<ServerDirectory>) -> GatewayRouter {
    GatewayRouter::new(Arc::clone(directory), BackendClient::new().unwrap())
}

pub fn aggregator(directory: &Arc<ServerDirectory>, timeout: Duration) -> HealthAggregator {
    HealthAggregator::new(Arc::clone(directory), BackendClient::new().unwrap()).with_timeout(timeout)
}
