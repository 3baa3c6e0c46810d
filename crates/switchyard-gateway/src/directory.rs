//! Server directory.
//!
//! Maps logical server names to endpoints and advertised capabilities. The
//! directory is read-mostly: lookups clone an `Arc` to the current snapshot
//! and never hold the lock while using it. [`ServerDirectory::reload`]
//! validates a new configuration completely before swapping the snapshot in
//! one step, so a reader sees either the old directory or the new one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::config::{GatewayConfig, ServerEntry};
use crate::error::ConfigError;

/// One backend server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Unique server name.
    pub name: String,
    /// Base URL.
    pub endpoint: String,
    /// Advertised capabilities, duplicates removed, first occurrence kept.
    pub capabilities: Vec<String>,
    /// Human-readable description.
    pub description: String,
}

impl From<&ServerEntry> for ServerRecord {
    fn from(entry: &ServerEntry) -> Self {
        let mut capabilities: Vec<String> = Vec::with_capacity(entry.capabilities.len());
        for capability in &entry.capabilities {
            if !capabilities.contains(capability) {
                capabilities.push(capability.clone());
            }
        }
        Self {
            name: entry.name.clone(),
            endpoint: entry.endpoint.trim_end_matches('/').to_string(),
            capabilities,
            description: entry.description.clone(),
        }
    }
}

/// Immutable view of the directory at one point in time.
#[derive(Debug, Default)]
pub struct DirectorySnapshot {
    records: Vec<ServerRecord>,
    index: HashMap<String, usize>,
}

impl DirectorySnapshot {
    fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let records: Vec<ServerRecord> = config.servers.iter().map(ServerRecord::from).collect();
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Ok(Self { records, index })
    }

    /// Look up a server by name.
    pub fn get(&self, name: &str) -> Option<&ServerRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    /// Every server in registration order.
    pub fn records(&self) -> &[ServerRecord] {
        &self.records
    }

    /// Number of servers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reloadable mapping of server name to [`ServerRecord`].
#[derive(Debug)]
pub struct ServerDirectory {
    current: RwLock<Arc<DirectorySnapshot>>,
}

impl ServerDirectory {
    /// Build a directory from a configuration.
    ///
    /// Fails on any validation error, including duplicate names.
    pub fn load(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let snapshot = DirectorySnapshot::from_config(config)?;
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Current snapshot. Holding it pins that version of the directory.
    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Look up a server by name.
    pub fn lookup(&self, name: &str) -> Option<ServerRecord> {
        self.snapshot().get(name).cloned()
    }

    /// Every server in registration order.
    pub fn all(&self) -> Vec<ServerRecord> {
        self.snapshot().records().to_vec()
    }

    /// Number of servers.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Replace the whole directory.
    ///
    /// The new configuration is validated first; on error the current
    /// directory stays in place.
    pub fn reload(&self, config: &GatewayConfig) -> Result<(), ConfigError> {
        let snapshot = Arc::new(DirectorySnapshot::from_config(config)?);
        let count = snapshot.len();
        {
            let mut guard = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = snapshot;
        }
        info!(servers = count, "server directory reloaded");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
