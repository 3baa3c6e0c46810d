//! Static directory configuration.
//!
//! The gateway reads one JSON document:
//!
//! ```json
//! {
//!   "name": "sales-gateway",
//!   "transport": {"port": 8080},
//!   "servers": {
//!     "crm":   {"description": "CRM", "capabilities": ["contacts"], "endpoint": "http://127.0.0.1:8101"},
//!     "calls": {"description": "Calls", "capabilities": ["transcripts"], "endpoint": "http://127.0.0.1:8102"}
//!   }
//! }
//! ```
//!
//! The key order of `servers` is the registration order. Repeated keys are
//! kept by the parser and rejected by validation instead of silently
//! overwriting each other.

use reqwest::Url;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::ConfigError;

/// Port used when `transport.port` is absent.
pub const DEFAULT_PORT: u16 = 8080;

/// Parsed and validated gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    /// Gateway name.
    pub name: String,
    /// Listener settings.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Backend servers in registration order.
    #[serde(deserialize_with = "ordered_servers")]
    pub servers: Vec<ServerEntry>,
}

/// Listener settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Port the gateway listens on.
    pub port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// One entry of the `servers` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerEntry {
    /// Table key.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Advertised capabilities.
    pub capabilities: Vec<String>,
    /// Base URL.
    pub endpoint: String,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default)]
    description: String,
    #[serde(default)]
    capabilities: Vec<String>,
    endpoint: String,
}

fn ordered_servers<'de, D>(deserializer: D) -> Result<Vec<ServerEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ServersVisitor;

    impl<'de> Visitor<'de> for ServersVisitor {
        type Value = Vec<ServerEntry>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object mapping server names to server entries")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut servers = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, raw)) = map.next_entry::<String, RawServer>()? {
                servers.push(ServerEntry {
                    name,
                    description: raw.description,
                    capabilities: raw.capabilities,
                    endpoint: raw.endpoint,
                });
            }
            Ok(servers)
        }
    }

    deserializer.deserialize_map(ServersVisitor)
}

impl GatewayConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// [`from_file`](Self::from_file) for use inside the runtime.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }

    /// Check every structural rule. The first violation is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }

        let mut seen = HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err(ConfigError::invalid("servers", "server names must not be empty"));
            }
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::DuplicateServer {
                    name: server.name.clone(),
                });
            }
            validate_endpoint(&server.name, &server.endpoint)?;
            if server.capabilities.iter().any(|c| c.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    format!("servers.{}.capabilities", server.name),
                    "capabilities must not be empty strings",
                ));
            }
        }
        Ok(())
    }

    /// Server names in registration order.
    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }
}

fn validate_endpoint(server: &str, endpoint: &str) -> Result<(), ConfigError> {
    let field = || format!("servers.{server}.endpoint");
    let url = Url::parse(endpoint).map_err(|e| ConfigError::invalid(field(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            field(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::invalid(field(), "missing host"));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
