//! Error types for switchyard-gateway

use std::path::PathBuf;
use switchyard_client::TransportError;
use thiserror::Error;

/// Result type alias for switchyard-gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in switchyard-gateway.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The directory configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A call to a backend failed.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Listener or socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP serving task ended abnormally.
    #[error("gateway task failed: {message}")]
    Task {
        /// Failure detail
        message: String,
    },
}

/// Rejected directory configuration.
///
/// Raised only when a configuration is loaded or reloaded; a rejected
/// configuration is never applied.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON of the expected shape.
    #[error("invalid directory JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two servers share a name.
    #[error("duplicate server '{name}'")]
    DuplicateServer {
        /// Repeated server name
        name: String,
    },

    /// A field failed validation.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Dotted path of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Creates a new validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure to route a call to a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RouteError {
    /// No server with that name is in the directory.
    #[error("server not found")]
    ServerNotFound {
        /// Requested server name
        name: String,
    },

    /// The backend call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
