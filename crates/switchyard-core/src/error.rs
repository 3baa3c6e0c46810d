//! Error types for switchyard-core

use thiserror::Error;

/// Result type alias for switchyard-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or validating wire messages.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Request body could not be decoded.
    #[error("invalid request body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request decoded but is not acceptable.
    #[error("validation error: {message}")]
    Validation {
        /// What went wrong
        message: String,
    },
}

impl Error {
    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::Serialization(_))
    }
}
