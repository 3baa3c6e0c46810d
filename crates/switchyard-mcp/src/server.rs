//! The protocol server.
//!
//! A [`ProtocolServer`] owns one [`ToolRegistry`], dispatches
//! [`ToolRequest`]s to it, keeps request counters and runs a background
//! self-health loop between explicit [`start`](ProtocolServer::start) and
//! [`stop`](ProtocolServer::stop) calls. Construction has no side effects.
//!
//! `invoke` never fails: unknown tools, handler errors and handler panics
//! all come back as a `ToolResponse` with `success: false`.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use switchyard_core::{BackgroundTask, ToolListing, ToolRequest, ToolResponse};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::handler::panic_message;
use crate::monitor::{AlwaysHealthy, HealthCheck, HealthMonitor, LoopPhase, LoopState};
use crate::registry::ToolRegistry;
use crate::stats::{ServerStats, StatsSnapshot};
use crate::tools::{Builtin, HealthReport, MetricsReport, RESERVED_TOOL_NAMES, builtin_listings};

/// Default interval between self-health checks.
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Default bound on one self-health check.
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time in-flight requests get to finish during shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

// ============================================================================
// ServerConfig
// ============================================================================

/// Identity and tunables of a protocol server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    name: String,
    version: String,
    port: u16,
    health_check_interval: Duration,
    health_check_timeout: Duration,
    shutdown_grace: Duration,
}

impl ServerConfig {
    /// Configuration with defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            port: 0,
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            health_check_timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Set the reported version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the reported port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the self-health interval.
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Set the bound on one self-health check.
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Set the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reported port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Self-health interval.
    pub fn health_check_interval(&self) -> Duration {
        self.health_check_interval
    }

    /// Bound on one self-health check.
    pub fn health_check_timeout(&self) -> Duration {
        self.health_check_timeout
    }

    /// Shutdown grace period.
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("server name must not be empty"));
        }
        if self.health_check_interval.is_zero() {
            return Err(Error::config("health_check_interval must be positive"));
        }
        if self.health_check_timeout.is_zero() {
            return Err(Error::config("health_check_timeout must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// ProtocolServer
// ============================================================================

/// One tool-serving process: registry, counters and health loop.
pub struct ProtocolServer {
    config: ServerConfig,
    registry: ToolRegistry,
    check: Arc<dyn HealthCheck>,
    stats: Arc<ServerStats>,
    state: Arc<watch::Sender<LoopState>>,
    monitor: Mutex<Option<BackgroundTask>>,
}

impl ProtocolServer {
    /// Create a server. Nothing is spawned until [`start`](Self::start).
    ///
    /// Fails if the configuration is invalid or the registry defines a
    /// reserved built-in name.
    pub fn new(config: ServerConfig, registry: ToolRegistry) -> Result<Self> {
        config.validate()?;
        if let Some(name) = RESERVED_TOOL_NAMES
            .iter()
            .find(|name| registry.contains(name))
        {
            return Err(Error::ReservedToolName {
                name: (*name).to_string(),
            });
        }

        let (state, _) = watch::channel(LoopState::idle());
        Ok(Self {
            config,
            registry,
            check: Arc::new(AlwaysHealthy),
            stats: Arc::new(ServerStats::new()),
            state: Arc::new(state),
            monitor: Mutex::new(None),
        })
    }

    /// Replace the self-health check.
    pub fn with_health_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.check = check;
        self
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Server name.
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// The owned registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Start the background health loop.
    ///
    /// Fails with [`Error::AlreadyRunning`] if the loop is running.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.monitor_slot();
        if slot.as_ref().is_some_and(BackgroundTask::is_running) {
            return Err(Error::AlreadyRunning {
                server: self.name().to_string(),
            });
        }

        let monitor = HealthMonitor {
            server: self.name().to_string(),
            interval: self.config.health_check_interval,
            timeout: self.config.health_check_timeout,
            check: Arc::clone(&self.check),
            stats: Arc::clone(&self.stats),
            state: Arc::clone(&self.state),
        };
        *slot = Some(monitor.spawn());
        info!(
            server = %self.name(),
            interval_secs = self.config.health_check_interval.as_secs_f64(),
            "health loop started"
        );
        Ok(())
    }

    /// Stop the health loop and wait for it to exit. No-op if not running.
    pub async fn stop(&self) {
        let task = self.monitor_slot().take();
        if let Some(task) = task {
            task.stop().await;
            self.state.send_modify(|s| s.phase = LoopPhase::Stopped);
            info!(server = %self.name(), "health loop stopped");
        }
    }

    /// Whether the health loop is running.
    pub fn is_running(&self) -> bool {
        self.monitor_slot()
            .as_ref()
            .is_some_and(BackgroundTask::is_running)
    }

    /// Current health loop state.
    pub fn loop_state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Receiver that observes every health loop transition.
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    fn monitor_slot(&self) -> MutexGuard<'_, Option<BackgroundTask>> {
        self.monitor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Invoke a tool.
    ///
    /// Built-in tools are answered directly and are not counted. Every
    /// other call increments `request_count`; handler failures and panics
    /// also increment `error_count`.
    pub async fn invoke(&self, request: ToolRequest) -> ToolResponse {
        let tool_name = request.tool_name().to_string();

        if let Some(builtin) = Builtin::from_tool_name(&tool_name) {
            return self.invoke_builtin(builtin).with_tool_name(&tool_name);
        }

        self.stats.record_request();

        let Some(definition) = self.registry.get(&tool_name) else {
            debug!(server = %self.name(), tool = %tool_name, "unknown tool");
            return ToolResponse::failure(format!("tool '{tool_name}' not found"))
                .with_tool_name(&tool_name);
        };

        let handler = definition.handler();
        let started = Instant::now();
        let outcome = AssertUnwindSafe(handler.invoke(request.into_parameters()))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(result)) => {
                debug!(server = %self.name(), tool = %tool_name, elapsed_ms, "tool succeeded");
                ToolResponse::ok(result).with_tool_name(&tool_name)
            }
            Ok(Err(e)) => {
                self.stats.record_error();
                warn!(server = %self.name(), tool = %tool_name, elapsed_ms, error = %e, "tool failed");
                ToolResponse::failure(e.message()).with_tool_name(&tool_name)
            }
            Err(payload) => {
                self.stats.record_error();
                let message = panic_message(payload.as_ref());
                warn!(server = %self.name(), tool = %tool_name, elapsed_ms, error = %message, "tool panicked");
                ToolResponse::failure(format!("handler panicked: {message}"))
                    .with_tool_name(&tool_name)
            }
        }
    }

    fn invoke_builtin(&self, builtin: Builtin) -> ToolResponse {
        match builtin {
            Builtin::Health => to_response(&self.health_report()),
            Builtin::Metrics => to_response(&self.metrics_report()),
        }
    }

    // ------------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------------

    /// Counter snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the most recent self-health check passed.
    pub fn is_healthy(&self) -> bool {
        self.stats.is_healthy()
    }

    /// Result of the `health` built-in.
    pub fn health_report(&self) -> HealthReport {
        HealthReport::from_snapshot(&self.stats(), self.config.port, &self.config.version)
    }

    /// Result of the `metrics` built-in.
    pub fn metrics_report(&self) -> MetricsReport {
        MetricsReport::from_snapshot(
            self.name(),
            self.registry.names(),
            &self.stats(),
            self.config.port,
            &self.config.version,
        )
    }

    /// `GET /tools` listing: business tools, then built-ins.
    pub fn listings(&self) -> Vec<ToolListing> {
        self.registry
            .list()
            .iter()
            .map(|t| t.to_listing())
            .chain(builtin_listings())
            .collect()
    }
}

impl std::fmt::Debug for ProtocolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolServer")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("loop_state", &self.loop_state())
            .finish_non_exhaustive()
    }
}

fn to_response<T: Serialize>(report: &T) -> ToolResponse {
    match serde_json::to_value(report) {
        Ok(value) => ToolResponse::ok(value),
        Err(e) => ToolResponse::failure(format!("failed to encode report: {e}")),
    }
}

// ============================================================================
// Tests
// ============================================================================
