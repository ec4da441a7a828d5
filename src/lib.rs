//! todo-mcp - todo list tools over MCP with Claude and OpenAI chat clients
//!
//! The crate has two halves. The tool service side (`store`, `tools`,
//! `mcp::server`) publishes five todo tools over MCP/SSE. The client side
//! (`providers`, `session`, `agent`, `mcp::client`) connects to a tool service
//! and runs an agentic tool-call loop against Anthropic or OpenAI.

pub mod agent;
pub mod config;
pub mod error;
pub mod mcp;
pub mod providers;
pub mod session;
pub mod store;
pub mod tools;
pub mod utils;

pub use agent::{AgentLoop, ChatSession, QueryObserver, QueryOutcome};
pub use config::Config;
pub use error::{ProviderError, Result, TodoMcpError};
pub use providers::{
    ClaudeProvider, CompletionOptions, CompletionOutcome, OpenAIProvider, ProviderAdapter,
    ToolDescriptor,
};
pub use session::{ConversationTurn, ToolCallRequest, ToolCallResult, Transcript};
pub use store::TodoStore;
pub use tools::{ToolOutput, ToolRegistry, ToolService};
