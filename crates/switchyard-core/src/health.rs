//! Health records and aggregate reports.
//!
//! A [`HealthRecord`] describes one probe of one server. An
//! [`AggregateHealthReport`] summarises a full poll cycle; records keep the
//! order they were supplied in, which callers set to directory order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome classification of a single health probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Answered `200` with a parseable body.
    Healthy,
    /// Answered, but with a non-`200` status or an unusable body.
    Unhealthy,
    /// Did not answer (connection failure, timeout).
    Unreachable,
}

impl HealthStatus {
    /// Returns `true` only for [`HealthStatus::Healthy`].
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Result of probing one server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Server name.
    pub service: String,
    /// Probe classification.
    pub status: HealthStatus,
    /// Round-trip time, when a response was received.
    pub response_time_ms: Option<u64>,
    /// When the probe finished.
    pub timestamp: DateTime<Utc>,
    /// Failure detail for unhealthy and unreachable servers.
    pub error: Option<String>,
}

impl HealthRecord {
    /// A healthy record.
    pub fn healthy(service: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            service: service.into(),
            status: HealthStatus::Healthy,
            response_time_ms: Some(response_time_ms),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// A server that answered but is not healthy.
    pub fn unhealthy(
        service: impl Into<String>,
        response_time_ms: Option<u64>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            status: HealthStatus::Unhealthy,
            response_time_ms,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// A server that could not be reached.
    pub fn unreachable(service: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status: HealthStatus::Unreachable,
            response_time_ms: None,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Summary of one poll cycle across every directory entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateHealthReport {
    /// When the report was assembled.
    pub timestamp: DateTime<Utc>,
    /// Number of servers probed.
    pub total: usize,
    /// Servers classified healthy.
    pub healthy_count: usize,
    /// Servers classified unhealthy or unreachable.
    pub unhealthy_count: usize,
    /// `healthy_count / total * 100`, rounded to one decimal.
    pub healthy_percentage: f64,
    /// Per-server records in directory order.
    pub services: Vec<HealthRecord>,
}

impl AggregateHealthReport {
    /// Assemble a report, keeping `records` in the given order.
    ///
    /// An empty record list yields a percentage of `0.0`.
    pub fn from_records(records: Vec<HealthRecord>) -> Self {
        let total = records.len();
        let healthy_count = records.iter().filter(|r| r.status.is_healthy()).count();
        let healthy_percentage = if total == 0 {
            0.0
        } else {
            round_one_decimal(healthy_count as f64 / total as f64 * 100.0)
        };

        Self {
            timestamp: Utc::now(),
            total,
            healthy_count,
            unhealthy_count: total - healthy_count,
            healthy_percentage,
            services: records,
        }
    }

    /// Returns `true` if no server is unhealthy or unreachable.
    pub fn all_healthy(&self) -> bool {
        self.unhealthy_count == 0
    }

    /// Process exit code for CI gating: `0` if all healthy, else `1`.
    pub fn exit_code(&self) -> i32 {
        if self.all_healthy() { 0 } else { 1 }
    }

    /// Look up the record for `service`.
    pub fn record(&self, service: &str) -> Option<&HealthRecord> {
        self.services.iter().find(|r| r.service == service)
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// Tests
// ============================================================================
