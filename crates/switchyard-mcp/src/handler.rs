//! Tool handler capability.
//!
//! Every tool is backed by one [`ToolHandler`] with a single asynchronous
//! `invoke` method. Plain closures are adapted at registration time:
//! [`FnHandler`] for synchronous closures and [`AsyncFnHandler`] for
//! closures that return a future.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use switchyard_core::Parameters;
use thiserror::Error;

/// Failure reported by a tool handler.
///
/// The message is returned to the caller verbatim in `ToolResponse.error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create a handler error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Create an error for parameters the handler cannot accept.
    pub fn invalid_params(message: impl std::fmt::Display) -> Self {
        Self::new(format!("invalid parameters: {message}"))
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_params(err)
    }
}

/// Deserialize handler parameters into a typed argument struct.
pub fn parse_params<T: DeserializeOwned>(parameters: Parameters) -> Result<T, HandlerError> {
    serde_json::from_value(Value::Object(parameters)).map_err(HandlerError::invalid_params)
}

/// Best-effort text of a captured panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Implementation of a tool's behaviour.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with the caller's parameters.
    async fn invoke(&self, parameters: Parameters) -> Result<Value, HandlerError>;
}

/// Adapter for synchronous closures.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(Parameters) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    /// Wrap a synchronous closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Parameters) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    async fn invoke(&self, parameters: Parameters) -> Result<Value, HandlerError> {
        (self.f)(parameters)
    }
}

/// Adapter for closures returning a future.
pub struct AsyncFnHandler<F> {
    f: F,
}

impl<F, Fut> AsyncFnHandler<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    /// Wrap an asynchronous closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for AsyncFnHandler<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn invoke(&self, parameters: Parameters) -> Result<Value, HandlerError> {
        (self.f)(parameters).await
    }
}

// ============================================================================
// Tests
// ============================================================================
