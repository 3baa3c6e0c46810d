//! Built-in tools.
//!
//! Tools provided by the core `switchyard-mcp` crate, available on every
//! protocol server.

pub mod health;

pub use health::{
    Builtin, HEALTH_TOOL, HealthReport, METRICS_TOOL, MetricsReport, RESERVED_TOOL_NAMES,
    RequestMetrics, SERVER_INFO_TOOL, ServerState, builtin_listings,
};
