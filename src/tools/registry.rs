//! Tool registry for todo-mcp
//!
//! This module provides the `ToolRegistry` struct for managing and executing tools.
//! Tools can be registered, looked up by name, and executed by name.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::error::Result;
use crate::providers::ToolDescriptor;
use crate::session::ToolArguments;

use super::{Tool, ToolOutput};

/// A registry that holds and manages tools.
///
/// Tools are listed in registration order.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use todo_mcp::store::TodoStore;
/// use todo_mcp::tools::{todo, ToolRegistry};
///
/// let mut registry = ToolRegistry::new();
/// todo::register_todo_tools(&mut registry, Arc::new(TodoStore::in_memory()));
///
/// assert!(registry.has("create_todo"));
/// assert_eq!(registry.len(), 5);
/// ```
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a new tool in the registry.
    ///
    /// If a tool with the same name already exists, it will be replaced in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        info!(tool = %name, "Registering tool");
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Execute a tool by name.
    ///
    /// Tool-not-found and recoverable tool failures come back as error outputs
    /// (`{"error": "..."}`). Only failures outside the tool's control, such as the
    /// store failing to persist, are returned as `Err`.
    pub async fn execute(&self, name: &str, args: ToolArguments) -> Result<ToolOutput> {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => {
                warn!(tool = name, "Unknown tool requested");
                return Ok(ToolOutput::error_json(&format!("Tool not found: {}", name)));
            }
        };

        let start = Instant::now();

        match tool.execute(args).await {
            Ok(output) => {
                info!(
                    tool = name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool executed successfully"
                );
                Ok(output)
            }
            Err(e) if e.is_recoverable() => {
                warn!(
                    tool = name,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool rejected request"
                );
                Ok(ToolOutput::error_json(&e.to_string()))
            }
            Err(e) => {
                error!(
                    tool = name,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool execution failed"
                );
                Err(e)
            }
        }
    }

    /// Descriptors for every registered tool, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| ToolDescriptor::new(t.name(), t.description()).with_schema(t.parameters()))
            .collect()
    }

    /// Names of all registered tools, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
