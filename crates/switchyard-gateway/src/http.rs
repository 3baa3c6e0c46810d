//! HTTP surface of the gateway.
//!
//! | Route | Answer |
//! |---|---|
//! | `GET /servers` | static server listing |
//! | `GET /servers/{name}/tools` | backend's tool listing |
//! | `POST /mcp/{server}` | proxied `ToolResponse` (tool named in body) |
//! | `POST /gateway/{server}/tools/{tool}` | proxied `ToolResponse` |
//! | `GET /health` | gateway liveness |
//! | `GET /health/servers` | on-demand aggregate report, `200` / `503` |
//! | `GET /health/history` | recent monitor reports, oldest first |
//! | `POST /admin/reload` | re-read the directory file |

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use switchyard_core::{
    AggregateHealthReport, META_SERVER_NAME, META_TOOL_NAME, Shutdown, ToolRequest, ToolResponse,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::aggregator::{HealthAggregator, HealthHistory};
use crate::config::GatewayConfig;
use crate::error::{ConfigError, Error, Result, RouteError};
use crate::router::{DEFAULT_PROXY_TIMEOUT, GatewayRouter, ServerSummary};

/// Everything the gateway's handlers share.
#[derive(Clone, Debug)]
pub struct GatewayState {
    name: String,
    router: GatewayRouter,
    aggregator: HealthAggregator,
    history: Arc<HealthHistory>,
    config_path: Option<PathBuf>,
    proxy_timeout: Duration,
    started: Instant,
}

impl GatewayState {
    /// Assemble the state.
    pub fn new(
        name: impl Into<String>,
        router: GatewayRouter,
        aggregator: HealthAggregator,
        history: Arc<HealthHistory>,
    ) -> Self {
        Self {
            name: name.into(),
            router,
            aggregator,
            history,
            config_path: None,
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
            started: Instant::now(),
        }
    }

    /// File re-read by `POST /admin/reload`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Bound on each proxied call.
    pub fn with_proxy_timeout(mut self, timeout: Duration) -> Self {
        self.proxy_timeout = timeout;
        self
    }

    /// Gateway name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The router.
    pub fn router(&self) -> &GatewayRouter {
        &self.router
    }

    /// The aggregator.
    pub fn aggregator(&self) -> &HealthAggregator {
        &self.aggregator
    }

    /// The report history.
    pub fn history(&self) -> &Arc<HealthHistory> {
        &self.history
    }

    /// Re-read the configured file and swap the directory.
    pub async fn reload(&self) -> Result<usize> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| ConfigError::invalid("config_path", "no configuration file to reload"))?;
        let config = GatewayConfig::load(path).await?;
        self.router.directory().reload(&config)?;
        Ok(config.servers.len())
    }
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/servers", get(list_servers))
        .route("/servers/{name}/tools", get(server_tools))
        .route("/mcp/{server}", post(proxy_body))
        .route("/gateway/{server}/tools/{tool}", post(proxy_path))
        .route("/health", get(gateway_health))
        .route("/health/servers", get(servers_health))
        .route("/health/history", get(health_history))
        .route("/admin/reload", post(reload))
        .with_state(state)
}

async fn list_servers(State(state): State<GatewayState>) -> Json<Vec<ServerSummary>> {
    Json(state.router.list_servers())
}

async fn server_tools(State(state): State<GatewayState>, Path(name): Path<String>) -> Response {
    match state.router.list_tools(&name, state.proxy_timeout).await {
        Ok(tools) => Json(tools).into_response(),
        Err(e @ RouteError::ServerNotFound { .. }) => {
            error_response(StatusCode::NOT_FOUND, &e.to_string())
        }
        Err(e) => error_response(StatusCode::BAD_GATEWAY, &e.to_string()),
    }
}

async fn proxy_body(
    State(state): State<GatewayState>,
    Path(server): Path<String>,
    body: Bytes,
) -> Json<ToolResponse> {
    match ToolRequest::from_slice(&body) {
        Ok(request) => Json(state.router.proxy(&server, &request, state.proxy_timeout).await),
        Err(e) => Json(rejected(&server, None, &e)),
    }
}

async fn proxy_path(
    State(state): State<GatewayState>,
    Path((server, tool)): Path<(String, String)>,
    body: Bytes,
) -> Json<ToolResponse> {
    match ToolRequest::from_slice_for_tool(&body, &tool) {
        Ok(request) => Json(state.router.proxy(&server, &request, state.proxy_timeout).await),
        Err(e) => Json(rejected(&server, Some(&tool), &e)),
    }
}

fn rejected(server: &str, tool: Option<&str>, error: &switchyard_core::Error) -> ToolResponse {
    warn!(server = %server, error = %error, "rejected proxy request");
    let response = ToolResponse::failure(error.to_string()).with_metadata(META_SERVER_NAME, server);
    match tool {
        Some(tool) => response.with_metadata(META_TOOL_NAME, tool),
        None => response,
    }
}

/// Body of the gateway's own `GET /health`.
#[derive(Debug, Serialize)]
struct GatewayHealth {
    status: &'static str,
    name: String,
    server_count: usize,
    uptime_seconds: u64,
    version: &'static str,
}

async fn gateway_health(State(state): State<GatewayState>) -> Json<GatewayHealth> {
    Json(GatewayHealth {
        status: "healthy",
        name: state.name.clone(),
        server_count: state.router.directory().len(),
        uptime_seconds: state.started.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn servers_health(State(state): State<GatewayState>) -> Response {
    let report = state.aggregator.check_all().await;
    report_response(report)
}

fn report_response(report: AggregateHealthReport) -> Response {
    let status = if report.all_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

async fn health_history(State(state): State<GatewayState>) -> Json<Vec<AggregateHealthReport>> {
    Json(state.history.reports())
}

async fn reload(State(state): State<GatewayState>) -> Response {
    match state.reload().await {
        Ok(count) => {
            info!(servers = count, "reload accepted");
            Json(json!({"status": "reloaded", "server_count": count})).into_response()
        }
        Err(e) => {
            warn!(error = %e, "reload rejected");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

/// Tunables for [`serve`].
#[derive(Clone, Copy, Debug)]
pub struct ServeOptions {
    /// Interval of the periodic health monitor; `None` disables it.
    pub monitor_interval: Option<Duration>,
    /// Time in-flight requests get to finish during shutdown.
    pub shutdown_grace: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            monitor_interval: Some(Duration::from_secs(30)),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// Serve the gateway on `listener` until `shutdown` resolves.
///
/// The periodic health monitor runs for the lifetime of the call. On
/// shutdown the listener stops accepting, the monitor is stopped and
/// in-flight requests get `shutdown_grace` to finish.
pub async fn serve<F>(
    state: GatewayState,
    listener: TcpListener,
    options: ServeOptions,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let addr = listener.local_addr()?;
    let monitor = options
        .monitor_interval
        .map(|interval| state.aggregator.spawn_monitor(interval, Arc::clone(&state.history)));
    info!(gateway = %state.name, %addr, servers = state.router.directory().len(), "listening");

    let drain = Shutdown::new();
    let mut drain_signal = drain.subscribe();
    let app = router(state.clone());
    let mut http: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain_signal.wait().await })
            .await
    });

    let early = tokio::select! {
        () = shutdown => None,
        joined = &mut http => Some(joined),
    };

    if let Some(joined) = early {
        if let Some(monitor) = monitor {
            monitor.stop().await;
        }
        return flatten(joined);
    }

    info!(gateway = %state.name, "shutting down");
    drain.trigger();
    if let Some(monitor) = monitor {
        monitor.stop().await;
    }

    match tokio::time::timeout(options.shutdown_grace, &mut http).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            warn!(
                gateway = %state.name,
                grace_ms = options.shutdown_grace.as_millis() as u64,
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
