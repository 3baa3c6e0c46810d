//! Tool-invocation wire contract.
//!
//! These types are shared by the serving side (`switchyard-mcp`), the
//! outbound client and the gateway. Field names are part of the HTTP+JSON
//! contract and are case-sensitive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Tool parameters: a JSON object keyed by parameter name.
pub type Parameters = Map<String, Value>;

/// Response metadata, e.g. `{"tool_name": "echo"}`.
pub type Metadata = Map<String, Value>;

/// Metadata key naming the invoked tool.
pub const META_TOOL_NAME: &str = "tool_name";

/// Metadata key naming the server a proxied call was routed to.
pub const META_SERVER_NAME: &str = "server_name";

// ============================================================================
// ToolRequest
// ============================================================================

/// A request to invoke one tool.
///
/// Fields are private; a request is immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    tool_name: String,
    #[serde(default)]
    parameters: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<Map<String, Value>>,
}

impl ToolRequest {
    /// Create a request with no context.
    pub fn new(tool_name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            context: None,
        }
    }

    /// Attach an opaque context that is passed through untouched.
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Decode a request from a JSON body.
    ///
    /// Fails if the body is not a JSON object with a string `tool_name`
    /// or if `parameters` is present but not an object.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let request: Self = serde_json::from_slice(body)?;
        if request.tool_name.trim().is_empty() {
            return Err(Error::validation("tool_name must not be empty"));
        }
        Ok(request)
    }

    /// Decode a request and check that it targets `path_tool`.
    pub fn from_slice_for_tool(body: &[u8], path_tool: &str) -> Result<Self> {
        let request = Self::from_slice(body)?;
        if request.tool_name != path_tool {
            return Err(Error::validation(format!(
                "tool_name '{}' does not match path tool '{path_tool}'",
                request.tool_name
            )));
        }
        Ok(request)
    }

    /// Name of the tool to invoke.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Tool parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Opaque caller context, if any.
    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.context.as_ref()
    }

    /// Consume the request, yielding its parameters.
    pub fn into_parameters(self) -> Parameters {
        self.parameters
    }
}

// ============================================================================
// ToolResponse
// ============================================================================

/// Outcome of a tool invocation.
///
/// `result` is present iff `success`; `error` is present iff `!success`.
/// The constructors uphold this; deserialized responses from remote
/// servers are passed through as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default)]
    metadata: Metadata,
}

impl ToolResponse {
    /// Successful response carrying `result`.
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            metadata: Metadata::new(),
        }
    }

    /// Failed response carrying `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add the `tool_name` metadata entry.
    pub fn with_tool_name(self, tool_name: &str) -> Self {
        self.with_metadata(META_TOOL_NAME, tool_name)
    }

    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Result value of a successful invocation.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Error message of a failed invocation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Response metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

// ============================================================================
// ToolListing
// ============================================================================

/// One entry of `GET /tools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolListing {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Input schema describing accepted parameters.
    pub parameters: Value,
    /// Optional grouping label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
