//! Background self-health loop.
//!
//! The loop alternates between sleeping for the configured interval and
//! running one [`HealthCheck`]. A check that errors, panics or exceeds its
//! timeout marks the server unhealthy; the loop keeps running regardless
//! and only ends when its owner stops it.
//!
//! Progress is published on a `watch` channel as a [`LoopState`] so callers
//! can observe transitions without polling.

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use switchyard_core::{BackgroundTask, ShutdownSignal};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::handler::{HandlerError, panic_message};
use crate::stats::ServerStats;

// ============================================================================
// HealthCheck
// ============================================================================

/// Injectable self-check run by the health loop.
///
/// `Ok(true)` means healthy, `Ok(false)` unhealthy. An `Err` is logged and
/// also counts as unhealthy.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Run one check.
    async fn check(&self) -> Result<bool, HandlerError>;
}

/// Check that always passes. Used when a server supplies none.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    async fn check(&self) -> Result<bool, HandlerError> {
        Ok(true)
    }
}

// ============================================================================
// LoopState
// ============================================================================

/// Phase of the health loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopPhase {
    /// Never started.
    Idle,
    /// Waiting for the next interval.
    Sleeping,
    /// Running a check.
    Checking,
    /// Stopped by its owner.
    Stopped,
}

/// Observable state of the health loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopState {
    /// Current phase.
    pub phase: LoopPhase,
    /// Completed check cycles since the loop was last started.
    pub cycles: u64,
    /// Outcome of the most recent cycle.
    pub last_result: Option<bool>,
}

impl LoopState {
    /// State of a loop that has never run.
    pub fn idle() -> Self {
        Self {
            phase: LoopPhase::Idle,
            cycles: 0,
            last_result: None,
        }
    }
}

impl Default for LoopState {
    fn default() -> Self {
        Self::idle()
    }
}

// ============================================================================
// HealthMonitor
// ============================================================================

/// Settings and collaborators for one run of the health loop.
pub(crate) struct HealthMonitor {
    pub(crate) server: String,
    pub(crate) interval: Duration,
    pub(crate) timeout: Duration,
    pub(crate) check: Arc<dyn HealthCheck>,
    pub(crate) stats: Arc<ServerStats>,
    pub(crate) state: Arc<watch::Sender<LoopState>>,
}

impl HealthMonitor {
    /// Spawn the loop; the returned task stops it.
    pub(crate) fn spawn(self) -> BackgroundTask {
        let name = format!("{}-health", self.server);
        self.state.send_replace(LoopState {
            phase: LoopPhase::Sleeping,
            cycles: 0,
            last_result: None,
        });
        BackgroundTask::spawn(name, move |signal| self.run(signal))
    }

    async fn run(self, mut signal: ShutdownSignal) {
        loop {
            self.set_phase(LoopPhase::Sleeping);
            if !signal.sleep(self.interval).await {
                break;
            }

            self.set_phase(LoopPhase::Checking);
            let healthy = tokio::select! {
                healthy = self.check_once() => healthy,
                _ = signal.wait() => break,
            };

            self.stats.set_healthy(healthy);
            self.state.send_modify(|s| {
                s.cycles += 1;
                s.last_result = Some(healthy);
            });
        }
        self.set_phase(LoopPhase::Stopped);
    }

    async fn check_once(&self) -> bool {
        let guarded = AssertUnwindSafe(self.check.check()).catch_unwind();
        match tokio::time::timeout(self.timeout, guarded).await {
            Ok(Ok(Ok(healthy))) => {
                self.stats.mark_checked(Utc::now());
                debug!(server = %self.server, healthy, "health check completed");
                healthy
            }
            Ok(Ok(Err(e))) => {
                warn!(server = %self.server, error = %e, "health check failed");
                false
            }
            Ok(Err(payload)) => {
                warn!(
                    server = %self.server,
                    error = %panic_message(payload.as_ref()),
                    "health check panicked"
                );
                false
            }
            Err(_) => {
                warn!(
                    server = %self.server,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "health check timed out"
                );
                false
            }
        }
    }

    fn set_phase(&self, phase: LoopPhase) {
        self.state.send_modify(|s| s.phase = phase);
    }
}

// ============================================================================
// Tests
// ============================================================================
