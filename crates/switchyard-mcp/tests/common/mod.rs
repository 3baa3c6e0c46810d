//! Common test utilities for switchyard-mcp integration tests.

use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use switchyard_core::Shutdown;
use switchyard_mcp::{
    HandlerError, Parameters, ProtocolServer, ServerConfig, ToolDefinition, ToolRegistry,
    parse_params,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A protocol server bound to an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub server: Arc<ProtocolServer>,
    shutdown: Shutdown,
    handle: JoinHandle<switchyard_mcp::Result<()>>,
}

impl TestServer {
    /// Serve `server` until [`shutdown`](Self::shutdown) is called. The
    /// health loop is already running when this returns.
    pub async fn spawn(server: ProtocolServer) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(server);
        server.start().unwrap();
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        let handle = tokio::spawn(switchyard_mcp::serve(
            Arc::clone(&server),
            listener,
            async move { signal.wait().await },
        ));
        Self {
            addr,
            server,
            shutdown,
            handle,
        }
    }

    /// Serve the standard test registry with the given config.
    pub async fn with_config(config: ServerConfig) -> Self {
        Self::spawn(ProtocolServer::new(config, test_registry()).unwrap()).await
    }

    /// Base URL of the server.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Trigger shutdown and wait for `serve` to return.
    pub async fn shutdown(self) -> switchyard_mcp::Result<()> {
        self.shutdown.trigger();
        self.handle.await.unwrap()
    }

    /// Trigger shutdown without waiting.
    pub fn begin_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait for `serve` to return.
    pub async fn join(self) -> switchyard_mcp::Result<()> {
        self.handle.await.unwrap()
    }
}

#[derive(Deserialize)]
struct SleepArgs {
    millis: u64,
}

/// Registry with `echo`, `fail` and `sleep`.
pub fn test_registry() -> ToolRegistry {
    ToolRegistry::from_definitions(vec![
        ToolDefinition::from_fn("echo", "Echo input", json!({"type": "object"}), |p| {
            Ok(Value::Object(p))
        }),
        ToolDefinition::from_fn("fail", "Always fails", json!({}), |_p| {
            Err(HandlerError::new("backend offline"))
        }),
        ToolDefinition::from_async(
            "sleep",
            "Sleep then answer",
            json!({"type": "object", "properties": {"millis": {"type": "integer"}}}),
            |p: Parameters| async move {
                let args: SleepArgs = parse_params(p)?;
                tokio::time::sleep(Duration::from_millis(args.millis)).await;
                Ok::<Value, HandlerError>(json!({"slept": args.millis}))
            },
        ),
    ])
    .unwrap()
}

/// Build a parameter map from a JSON object literal.
pub fn params(value: Value) -> Parameters {
    match value {
        Value::Object(map) => map,
        _ => Parameters::new(),
    }
}
