//! Error types for switchyard-mcp

use thiserror::Error;

/// Result type alias for switchyard-mcp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in switchyard-mcp.
///
/// Tool-level failures (unknown tool, handler errors) are not errors at
/// this level; they are reported inside a `ToolResponse`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from switchyard-core
    #[error("Core error: {0}")]
    Core(#[from] switchyard_core::Error),

    /// A tool with this name is already registered.
    #[error("tool '{name}' is already registered")]
    AlreadyRegistered {
        /// Duplicate tool name
        name: String,
    },

    /// A registry tried to define a built-in tool name.
    #[error("tool name '{name}' is reserved for a built-in tool")]
    ReservedToolName {
        /// Offending tool name
        name: String,
    },

    /// `start` was called while the health loop is already running.
    #[error("health loop for server '{server}' is already running")]
    AlreadyRunning {
        /// Server name
        server: String,
    },

    /// Invalid server configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Listener or socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP serving task ended abnormally.
    #[error("server task failed: {message}")]
    Task {
        /// Failure detail
        message: String,
    },
}

impl Error {
    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
