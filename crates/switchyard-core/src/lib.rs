//! Switchyard Core: shared wire types, health records and lifecycle primitives.
//!
//! This crate has no internal Switchyard dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`protocol`]: `ToolRequest`, `ToolResponse`, `ToolListing`
//! - [`health`]: `HealthRecord`, `HealthStatus`, `AggregateHealthReport`
//! - [`lifecycle`]: `Shutdown`, `ShutdownSignal`, `BackgroundTask`
//! - [`error`]: Error types and Result alias

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod error;
pub mod health;
pub mod lifecycle;
pub mod protocol;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use health::{AggregateHealthReport, HealthRecord, HealthStatus};
pub use lifecycle::{BackgroundTask, Shutdown, ShutdownSignal};
pub use protocol::{
    META_SERVER_NAME, META_TOOL_NAME, Metadata, Parameters, ToolListing, ToolRequest,
    ToolResponse,
};
