//! Switchyard Gateway: directory, proxying and health aggregation.
//!
//! # Modules
//!
//! - [`config`]: JSON directory configuration and validation
//! - [`directory`]: `ServerDirectory` with atomic reload
//! - [`router`]: `GatewayRouter` proxying tool calls to backends
//! - [`aggregator`]: `HealthAggregator` and `HealthHistory`
//! - [`http`]: axum routes and graceful `serve`
//! - [`error`]: Error types and Result alias
//!
//! # Example
//!
//! ```rust,ignore
//! let config = GatewayConfig::from_file("gateway.json")?;
//! let directory = Arc::new(ServerDirectory::load(&config)?);
//! let client = BackendClient::new()?;
//! let aggregator = HealthAggregator::new(Arc::clone(&directory), client.clone());
//! let report = aggregator.check_all().await;
//! std::process::exit(report.exit_code());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod aggregator;
pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod router;

pub use aggregator::{HealthAggregator, HealthHistory};
pub use config::{GatewayConfig, ServerEntry, TransportConfig};
pub use directory::{DirectorySnapshot, ServerDirectory, ServerRecord};
pub use error::{ConfigError, Error, Result, RouteError};
pub use http::{GatewayState, ServeOptions, router, serve};
pub use router::{GatewayRouter, ServerSummary};
