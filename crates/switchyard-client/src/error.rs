//! Error types for switchyard-client

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for switchyard-client operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Classified failure of one outbound call.
///
/// The `Display` output is what callers place in `ToolResponse.error` and
/// `HealthRecord.error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The call did not finish within its timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that was exceeded
        timeout_ms: u64,
    },

    /// No connection could be established.
    #[error("connection failed: {message}")]
    Connect {
        /// Underlying cause
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {code}")]
    Status {
        /// HTTP status code
        code: u16,
    },

    /// The response body could not be decoded.
    #[error("invalid response body: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },

    /// Any other failure building or sending the request.
    #[error("request failed: {message}")]
    Request {
        /// Underlying cause
        message: String,
    },
}

impl TransportError {
    /// Classify a `reqwest` failure.
    pub fn classify(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if err.is_connect() {
            Self::Connect {
                message: error_chain(err),
            }
        } else if err.is_decode() {
            Self::Decode {
                message: error_chain(err),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                code: status.as_u16(),
            }
        } else {
            Self::Request {
                message: error_chain(err),
            }
        }
    }

    /// Creates a new request error.
    pub fn request<S: Into<String>>(message: S) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// `true` when the target never produced an HTTP response.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Connect { .. } | Self::Request { .. }
        )
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

/// Render an error with its sources, outermost first.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
