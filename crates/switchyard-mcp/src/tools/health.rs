//! Built-in `health` and `metrics` tools.
//!
//! Every protocol server answers these regardless of what it registers.
//! Calls to them are not counted in the business request and error
//! counters, so polling a server never skews its own error rate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use switchyard_core::ToolListing;

use crate::stats::StatsSnapshot;

/// Name of the built-in health tool.
pub const HEALTH_TOOL: &str = "health";

/// Name of the built-in metrics tool.
pub const METRICS_TOOL: &str = "metrics";

/// Alias accepted for the metrics tool.
pub const SERVER_INFO_TOOL: &str = "get_server_info";

/// Names a registry may not define.
pub const RESERVED_TOOL_NAMES: [&str; 3] = [HEALTH_TOOL, METRICS_TOOL, SERVER_INFO_TOOL];

/// Module label reported for built-in tools in listings.
pub const BUILTIN_MODULE: &str = "builtin";

/// Which built-in a tool name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// `health`
    Health,
    /// `metrics` or `get_server_info`
    Metrics,
}

impl Builtin {
    /// Resolve a tool name to a built-in, if it is one.
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            HEALTH_TOOL => Some(Self::Health),
            METRICS_TOOL | SERVER_INFO_TOOL => Some(Self::Metrics),
            _ => None,
        }
    }
}

/// Overall state reported by the `health` tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    /// The last health check passed.
    Healthy,
    /// The last health check failed.
    Unhealthy,
}

impl From<bool> for ServerState {
    fn from(healthy: bool) -> Self {
        if healthy { Self::Healthy } else { Self::Unhealthy }
    }
}

/// Result of the `health` tool and body of `GET /health`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `"healthy"` or `"unhealthy"` on the wire.
    pub status: ServerState,
    /// Seconds since the server was constructed.
    pub uptime_seconds: u64,
    /// Business requests handled.
    pub request_count: u64,
    /// Business requests whose handler failed.
    pub error_count: u64,
    /// `error_count / max(1, request_count)`.
    pub error_rate: f64,
    /// When the background check last completed.
    pub last_health_check: Option<DateTime<Utc>>,
    /// Port the server is configured for.
    pub port: u16,
    /// Server version.
    pub version: String,
}

impl HealthReport {
    /// Build from a stats snapshot.
    pub fn from_snapshot(stats: &StatsSnapshot, port: u16, version: &str) -> Self {
        Self {
            status: ServerState::from(stats.is_healthy),
            uptime_seconds: stats.uptime.as_secs(),
            request_count: stats.request_count,
            error_count: stats.error_count,
            error_rate: stats.error_rate(),
            last_health_check: stats.last_health_check,
            port,
            version: version.to_string(),
        }
    }

    /// Whether the report says healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == ServerState::Healthy
    }
}

/// Request counters reported by the `metrics` tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestMetrics {
    /// Business requests handled.
    pub total: u64,
    /// Business requests whose handler failed.
    pub errors: u64,
    /// `1 - error_rate`.
    pub success_rate: f64,
}

/// Result of the `metrics` tool and body of `GET /metrics`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Server name.
    pub name: String,
    /// Registered business tool names, in registration order.
    pub capabilities: Vec<String>,
    /// Request counters.
    pub requests: RequestMetrics,
    /// Embedded health report.
    pub health: HealthReport,
}

impl MetricsReport {
    /// Build from a stats snapshot.
    pub fn from_snapshot(
        name: &str,
        capabilities: Vec<String>,
        stats: &StatsSnapshot,
        port: u16,
        version: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            capabilities,
            requests: RequestMetrics {
                total: stats.request_count,
                errors: stats.error_count,
                success_rate: 1.0 - stats.error_rate(),
            },
            health: HealthReport::from_snapshot(stats, port, version),
        }
    }
}

/// Listings for the built-in tools, appended after business tools.
pub fn builtin_listings() -> Vec<ToolListing> {
    vec![
        ToolListing {
            name: HEALTH_TOOL.to_string(),
            description: "Check server health and status".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
            module: Some(BUILTIN_MODULE.to_string()),
        },
        ToolListing {
            name: METRICS_TOOL.to_string(),
            description: "Report server capabilities and request metrics".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
            module: Some(BUILTIN_MODULE.to_string()),
        },
    ]
}

// ============================================================================
// Tests
// ============================================================================
