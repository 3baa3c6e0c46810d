//! Per-server counters and health flag.
//!
//! Requests are served concurrently on a multi-threaded runtime, so every
//! field is an atomic. Readers take a [`StatsSnapshot`].

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

const NEVER_CHECKED: i64 = i64::MIN;

/// Live counters owned by one `ProtocolServer`.
#[derive(Debug)]
pub struct ServerStats {
    started: Instant,
    request_count: AtomicU64,
    error_count: AtomicU64,
    is_healthy: AtomicBool,
    last_health_check_ms: AtomicI64,
}

impl ServerStats {
    /// Fresh counters; the server starts out healthy and never checked.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            is_healthy: AtomicBool::new(true),
            last_health_check_ms: AtomicI64::new(NEVER_CHECKED),
        }
    }

    pub(crate) fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Release);
    }

    pub(crate) fn mark_checked(&self, at: DateTime<Utc>) {
        self.last_health_check_ms
            .store(at.timestamp_millis(), Ordering::Release);
    }

    /// Whether the most recent health check passed.
    pub fn is_healthy(&self) -> bool {
        self.is_healthy.load(Ordering::Acquire)
    }

    /// Consistent-enough copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        let last_ms = self.last_health_check_ms.load(Ordering::Acquire);
        StatsSnapshot {
            uptime: self.started.elapsed(),
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            is_healthy: self.is_healthy(),
            last_health_check: if last_ms == NEVER_CHECKED {
                None
            } else {
                DateTime::from_timestamp_millis(last_ms)
            },
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ServerStats`].
#[derive(Clone, Debug, PartialEq)]
pub struct StatsSnapshot {
    /// Time since the server was constructed.
    pub uptime: Duration,
    /// Business requests handled.
    pub request_count: u64,
    /// Business requests whose handler failed.
    pub error_count: u64,
    /// Result of the most recent health check.
    pub is_healthy: bool,
    /// When the most recent health check completed.
    pub last_health_check: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    /// `error_count / max(1, request_count)`.
    pub fn error_rate(&self) -> f64 {
        self.error_count as f64 / self.request_count.max(1) as f64
    }
}

// ============================================================================
// Tests
// ============================================================================
