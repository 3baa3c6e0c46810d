//! Backend client.
//!
//! One [`BackendClient`] is shared by every outbound call a process makes.
//! `reqwest::Client` keeps a connection pool internally but holds no
//! per-request state, so a failed call never affects concurrent calls to
//! other servers. Each call carries its own timeout.

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use switchyard_core::{ToolListing, ToolRequest, ToolResponse};
use tracing::debug;

use crate::error::{Result, TransportError};

/// Answer received from `GET {endpoint}/health`.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthProbe {
    /// HTTP status code.
    pub status: u16,
    /// Round-trip time, including reading the body.
    pub elapsed: Duration,
    /// Decoded JSON body, `None` if it was not valid JSON.
    pub payload: Option<Value>,
}

impl HealthProbe {
    /// Elapsed time in whole milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// HTTP client for Switchyard tool servers.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: Client,
}

impl BackendClient {
    /// Create a client with a fresh connection pool.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("switchyard/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TransportError::request(e.to_string()))?;
        Ok(Self { http })
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// `POST {endpoint}/tools/{tool_name}` with `request` as the body.
    ///
    /// A 2xx answer is decoded and returned unchanged, whatever its
    /// `success` flag says.
    pub async fn call_tool(
        &self,
        endpoint: &str,
        request: &ToolRequest,
        timeout: Duration,
    ) -> Result<ToolResponse> {
        let url = endpoint_url(endpoint, &["tools", request.tool_name()])?;
        let started = Instant::now();
        let response = self
            .http
            .post(url.clone())
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::classify(&e, timeout))?;

        let decoded = read_json(response, timeout).await;
        debug!(
            %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = decoded.is_ok(),
            "tool call finished"
        );
        decoded
    }

    /// `GET {endpoint}/tools`.
    pub async fn list_tools(&self, endpoint: &str, timeout: Duration) -> Result<Vec<ToolListing>> {
        let url = endpoint_url(endpoint, &["tools"])?;
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::classify(&e, timeout))?;
        read_json(response, timeout).await
    }

    /// `GET {endpoint}/health`.
    ///
    /// Any HTTP answer is returned as a [`HealthProbe`]; only transport
    /// failures are errors. Status classification is left to the caller.
    pub async fn probe_health(&self, endpoint: &str, timeout: Duration) -> Result<HealthProbe> {
        let url = endpoint_url(endpoint, &["health"])?;
        let started = Instant::now();
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::classify(&e, timeout))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::classify(&e, timeout))?;

        Ok(HealthProbe {
            status,
            elapsed: started.elapsed(),
            payload: serde_json::from_slice(&body).ok(),
        })
    }
}

/// Append path segments to a base endpoint URL, percent-encoding them.
pub fn endpoint_url(endpoint: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| TransportError::request(format!("invalid endpoint '{endpoint}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| TransportError::request(format!("endpoint '{endpoint}' cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, timeout: Duration) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            code: status.as_u16(),
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| TransportError::classify(&e, timeout))?;
    Ok(serde_json::from_slice(&body)?)
}

// ============================================================================
// Tests
// ============================================================================
