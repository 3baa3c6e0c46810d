//! Tool registry for protocol servers.
//!
//! A [`ToolRegistry`] is an ordered, in-memory catalog of
//! [`ToolDefinition`]s. Names are unique; registering a duplicate fails
//! without touching the registry. Listing order is registration order,
//! which keeps `GET /tools` output deterministic.
//!
//! Each `ProtocolServer` owns its registry exclusively. Servers made of
//! several tool modules build one registry per module and combine them
//! with [`ToolRegistry::merge`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = ToolRegistry::new();
//! registry.register(ToolDefinition::from_fn(
//!     "echo",
//!     "Return the parameters unchanged",
//!     json!({"type": "object"}),
//!     |params| Ok(Value::Object(params)),
//! ))?;
//! ```

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use switchyard_core::{Parameters, ToolListing};

use crate::error::{Error, Result};
use crate::handler::{AsyncFnHandler, FnHandler, HandlerError, ToolHandler};

// ============================================================================
// ToolDefinition
// ============================================================================

/// A named, schema-described tool and the handler that implements it.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    input_schema: Value,
    module: Option<String>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    /// Create a definition backed by any [`ToolHandler`].
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            module: None,
            handler,
        }
    }

    /// Create a definition from a synchronous closure.
    pub fn from_fn<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        f: F,
    ) -> Self
    where
        F: Fn(Parameters) -> std::result::Result<Value, HandlerError> + Send + Sync + 'static,
    {
        Self::new(name, description, input_schema, Arc::new(FnHandler::new(f)))
    }

    /// Create a definition from a closure returning a future.
    pub fn from_async<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        f: F,
    ) -> Self
    where
        F: Fn(Parameters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, HandlerError>> + Send + 'static,
    {
        Self::new(
            name,
            description,
            input_schema,
            Arc::new(AsyncFnHandler::new(f)),
        )
    }

    /// Tag the tool with a module label.
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Input schema.
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Module label, if any.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Shared handle to the handler.
    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }

    /// Wire listing for `GET /tools`. The handler is never serialized.
    pub fn to_listing(&self) -> ToolListing {
        ToolListing {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
            module: self.module.clone(),
        }
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ToolRegistry
// ============================================================================

/// Ordered catalog of tools keyed by unique name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from definitions, failing on the first duplicate.
    pub fn from_definitions<I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = ToolDefinition>,
    {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Register a tool.
    ///
    /// Fails with [`Error::AlreadyRegistered`] if the name is taken; the
    /// registry is unchanged in that case.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<()> {
        if self.index.contains_key(definition.name()) {
            return Err(Error::AlreadyRegistered {
                name: definition.name().to_string(),
            });
        }
        self.index
            .insert(definition.name().to_string(), self.tools.len());
        self.tools.push(definition);
        Ok(())
    }

    /// Append every tool of `other`, keeping its order.
    ///
    /// All names are checked before anything is inserted, so a conflict
    /// leaves `self` unchanged.
    pub fn merge(&mut self, other: ToolRegistry) -> Result<()> {
        if let Some(duplicate) = other.tools.iter().find(|t| self.contains(t.name())) {
            return Err(Error::AlreadyRegistered {
                name: duplicate.name().to_string(),
            });
        }
        for definition in other.tools {
            self.register(definition)?;
        }
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in registration order.
    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    /// Whether a tool with `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
