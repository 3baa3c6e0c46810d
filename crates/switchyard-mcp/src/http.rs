//! HTTP surface of a protocol server.
//!
//! | Route | Answer |
//! |---|---|
//! | `GET /tools` | tool listings, business tools first |
//! | `POST /tools/{name}` | `ToolResponse`, always `200` |
//! | `GET /health` | health report, `200` healthy / `503` unhealthy |
//! | `GET /metrics` | metrics report |
//!
//! [`serve`] runs the router until a shutdown future resolves, then drains:
//! the listener stops accepting, the health loop is stopped, and in-flight
//! requests get the configured grace period before being dropped.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use switchyard_core::{Shutdown, ToolListing, ToolRequest, ToolResponse};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::server::ProtocolServer;
use crate::tools::MetricsReport;

/// Build the router for `server`.
pub fn router(server: Arc<ProtocolServer>) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(call_tool))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(server)
}

async fn list_tools(State(server): State<Arc<ProtocolServer>>) -> Json<Vec<ToolListing>> {
    Json(server.listings())
}

async fn call_tool(
    State(server): State<Arc<ProtocolServer>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Json<ToolResponse> {
    match ToolRequest::from_slice_for_tool(&body, &name) {
        Ok(request) => Json(server.invoke(request).await),
        Err(e) => {
            warn!(server = %server.name(), tool = %name, error = %e, "rejected tool request");
            Json(ToolResponse::failure(e.to_string()).with_tool_name(&name))
        }
    }
}

async fn health(State(server): State<Arc<ProtocolServer>>) -> Response {
    let report = server.health_report();
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

async fn metrics(State(server): State<Arc<ProtocolServer>>) -> Json<MetricsReport> {
    Json(server.metrics_report())
}

/// Serve `server` on `listener` until `shutdown` resolves.
///
/// Starts the health loop if it is not already running. On shutdown the
/// health loop is stopped before in-flight requests are drained.
pub async fn serve<F>(server: Arc<ProtocolServer>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let addr = listener.local_addr()?;
    if !server.is_running() {
        server.start()?;
    }
    info!(server = %server.name(), %addr, "listening");

    let drain = Shutdown::new();
    let mut drain_signal = drain.subscribe();
    let app = router(Arc::clone(&server));
    let mut http: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain_signal.wait().await })
            .await
    });

    tokio::select! {
        () = shutdown => {}
        joined = &mut http => {
            server.stop().await;
            return flatten(joined);
        }
    }

    info!(server = %server.name(), "shutting down");
    drain.trigger();
    server.stop().await;

    let grace = server.config().shutdown_grace();
    match tokio::time::timeout(grace, &mut http).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            warn!(
                server = %server.name(),
                grace_ms = grace.as_millis() as u64,
                "in-flight requests exceeded grace period; aborting"
            );
            http.abort();
            Ok(())
        }
    }
}

fn flatten(joined: std::result::Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result.map_err(Error::from),
        Err(e) => Err(Error::Task {
            message: e.to_string(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
