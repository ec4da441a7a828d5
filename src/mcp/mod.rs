//! Model Context Protocol over SSE
//!
//! JSON-RPC 2.0 messages ([`protocol`]), a client that consumes a remote tool
//! service ([`McpClient`]) and, with the `server` feature, a server that
//! publishes one ([`McpServer`]).

pub mod client;
pub mod protocol;
#[cfg(feature = "server")]
pub mod server;

pub use client::McpClient;
pub use protocol::{CallToolResult, McpContent, McpTool, MCP_PROTOCOL_VERSION};
#[cfg(feature = "server")]
pub use server::McpServer;
