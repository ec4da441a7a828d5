//! Agent module - the agentic tool-call loop and chat sessions
//!
//! The agent takes a user query, asks a provider for a completion, runs the
//! tools the provider asks for against a tool service, feeds the results back
//! and repeats until the provider answers or the iteration cap is reached.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │ ChatSession │────>│  AgentLoop  │────>│ ProviderAdapter  │
//! │             │     │             │     │ (Claude, OpenAI) │
//! └─────────────┘     └─────────────┘     └──────────────────┘
//!        │                   │
//!        │ connect           │ invoke
//!        ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  McpClient  │────>│ ToolService │
//! │   (SSE)     │     │             │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! Loop states:
//!
//! ```text
//! AwaitingCompletion ──tool calls──> DispatchingTools ──(cap reached)──> Exhausted
//!        │    ▲                              │
//!        │    └──────────────────────────────┘
//!        ├──final answer──> Done
//!        └──unrecognized / error──> Failed
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use todo_mcp::agent::{ChatSession, QueryOutcome};
//! use todo_mcp::providers::ClaudeProvider;
//!
//! # async fn run() -> todo_mcp::Result<()> {
//! let provider = ClaudeProvider::new("sk-ant-...", "claude-sonnet-4-5-20250929");
//! let mut session =
//!     ChatSession::connect(provider, "http://localhost:8001/sse", Duration::from_secs(30)).await?;
//!
//! if let QueryOutcome::Answer(text) = session.process_query("What's on my list?").await? {
//!     println!("{}", text);
//! }
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod chat;
mod r#loop;

pub use chat::ChatSession;
pub use r#loop::{AgentLoop, QueryObserver, QueryOutcome, SilentObserver, DEFAULT_MAX_ITERATIONS};
