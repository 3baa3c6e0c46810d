//! Switchyard MCP: the tool-serving side of Switchyard.
//!
//! A domain server supplies only its [`ToolDefinition`]s; everything else
//! (dispatch, counters, built-in `health`/`metrics` tools, the self-health
//! loop and the HTTP surface) is implemented once here.
//!
//! # Example
//!
//! ```rust,ignore
//! use switchyard_mcp::{ProtocolServer, ServerConfig, ToolDefinition, ToolRegistry};
//!
//! let registry = ToolRegistry::from_definitions(vec![ToolDefinition::from_fn(
//!     "echo",
//!     "Return the parameters unchanged",
//!     json!({"type": "object"}),
//!     |params| Ok(Value::Object(params)),
//! )])?;
//! let server = Arc::new(ProtocolServer::new(ServerConfig::new("demo"), registry)?);
//! switchyard_mcp::serve(server, listener, shutdown_signal()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod error;
pub mod handler;
pub mod http;
pub mod monitor;
pub mod registry;
pub mod server;
pub mod stats;
pub mod tools;

pub use error::{Error, Result};
pub use handler::{AsyncFnHandler, FnHandler, HandlerError, ToolHandler, parse_params};
pub use http::{router, serve};
pub use monitor::{AlwaysHealthy, HealthCheck, LoopPhase, LoopState};
pub use registry::{ToolDefinition, ToolRegistry};
pub use server::{ProtocolServer, ServerConfig};
pub use stats::StatsSnapshot;
pub use tools::{HealthReport, MetricsReport, ServerState};

// Re-export core wire types for handler authors
pub use switchyard_core::{Parameters, ToolListing, ToolRequest, ToolResponse};
