//! Tool-call proxying.
//!
//! [`GatewayRouter::proxy`] resolves a server name through the
//! [`ServerDirectory`] and forwards the request with its own timeout. Every
//! failure is turned into a `ToolResponse`; a successful backend answer is
//! returned exactly as received.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use switchyard_client::BackendClient;
use switchyard_core::{META_SERVER_NAME, META_TOOL_NAME, ToolListing, ToolRequest, ToolResponse};
use tracing::{debug, warn};

use crate::directory::{ServerDirectory, ServerRecord};
use crate::error::RouteError;

/// Default bound on one proxied call.
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(30);

/// Status reported for every entry of [`GatewayRouter::list_servers`].
pub const STATUS_AVAILABLE: &str = "available";

/// One entry of `GET /servers`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSummary {
    /// Server name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Advertised capabilities.
    pub capabilities: Vec<String>,
    /// Base URL.
    pub endpoint: String,
    /// Always `"available"`.
    pub status: String,
}

impl From<ServerRecord> for ServerSummary {
    fn from(record: ServerRecord) -> Self {
        Self {
            name: record.name,
            description: record.description,
            capabilities: record.capabilities,
            endpoint: record.endpoint,
            status: STATUS_AVAILABLE.to_string(),
        }
    }
}

/// Routes tool calls to backend servers.
#[derive(Clone, Debug)]
pub struct GatewayRouter {
    directory: Arc<ServerDirectory>,
    client: BackendClient,
}

impl GatewayRouter {
    /// Create a router over `directory`, sending through `client`.
    pub fn new(directory: Arc<ServerDirectory>, client: BackendClient) -> Self {
        Self { directory, client }
    }

    /// The directory this router resolves names against.
    pub fn directory(&self) -> &Arc<ServerDirectory> {
        &self.directory
    }

    /// Forward `request` to `server_name`, bounded by `timeout`.
    ///
    /// Unknown servers fail without any network call.
    pub async fn proxy(
        &self,
        server_name: &str,
        request: &ToolRequest,
        timeout: Duration,
    ) -> ToolResponse {
        let Some(record) = self.directory.lookup(server_name) else {
            debug!(server = %server_name, tool = %request.tool_name(), "unknown server");
            return failure(
                &RouteError::ServerNotFound {
                    name: server_name.to_string(),
                },
                server_name,
                request.tool_name(),
            );
        };

        match self.client.call_tool(&record.endpoint, request, timeout).await {
            Ok(response) => {
                debug!(
                    server = %server_name,
                    tool = %request.tool_name(),
                    success = response.is_success(),
                    "proxied tool call"
                );
                response
            }
            Err(e) => {
                warn!(
                    server = %server_name,
                    tool = %request.tool_name(),
                    error = %e,
                    "proxied tool call failed"
                );
                failure(&RouteError::from(e), server_name, request.tool_name())
            }
        }
    }

    /// Fetch the backend's own tool listing.
    pub async fn list_tools(
        &self,
        server_name: &str,
        timeout: Duration,
    ) -> Result<Vec<ToolListing>, RouteError> {
        let record = self
            .directory
            .lookup(server_name)
            .ok_or_else(|| RouteError::ServerNotFound {
                name: server_name.to_string(),
            })?;
        self.client
            .list_tools(&record.endpoint, timeout)
            .await
            .map_err(|e| {
                warn!(server = %server_name, error = %e, "tool listing failed");
                RouteError::from(e)
            })
    }

    /// Static listing of every directory entry. Performs no probes.
    pub fn list_servers(&self) -> Vec<ServerSummary> {
        self.directory
            .all()
            .into_iter()
            .map(ServerSummary::from)
            .collect()
    }
}

fn failure(error: &RouteError, server_name: &str, tool_name: &str) -> ToolResponse {
    ToolResponse::failure(error.to_string())
        .with_metadata(META_TOOL_NAME, tool_name)
        .with_metadata(META_SERVER_NAME, server_name)
}

// ============================================================================
// Tests
// ============================================================================
