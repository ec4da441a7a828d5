//! Tools module - tool definitions and execution
//!
//! This module provides the todo tools and the infrastructure to publish and run
//! them.
//!
//! # Overview
//!
//! - `Tool` trait: the interface every tool implements
//! - `ToolRegistry`: registry that lists tools and executes them by name
//! - `ToolService`: discovery + invocation as the chat loop sees it, implemented
//!   by the registry (in-process) and by the MCP client (over SSE)
//! - `todo`: `list_todos`, `create_todo`, `update_todo`, `delete_todo`, `get_todo`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use todo_mcp::store::TodoStore;
//! use todo_mcp::tools::{todo, ToolRegistry};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut registry = ToolRegistry::new();
//! todo::register_todo_tools(&mut registry, Arc::new(TodoStore::in_memory()));
//!
//! let args = json!({"title": "Water plants"}).as_object().cloned().unwrap();
//! let output = registry.execute("create_todo", args).await.unwrap();
//! assert!(!output.is_error);
//! # });
//! ```

mod registry;
mod service;
pub mod todo;
mod types;

pub use registry::ToolRegistry;
pub use service::ToolService;
pub use types::{Tool, ToolOutput};
