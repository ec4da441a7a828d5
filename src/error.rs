//! Error types for todo-mcp
//!
//! This module defines the error types used across the tool service, the MCP
//! transport and the two LLM clients. Uses `thiserror` for the `Display` and
//! `Error` implementations.
//!
//! Recoverable tool failures (a missing todo, a bad argument) are carried as
//! `NotFound` / `Validation` values and turned into error *results* by the tool
//! layer; they never abort a conversation.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured provider error classification.
///
/// Categorizes LLM provider HTTP failures so callers can report them without
/// string matching.
#[derive(Debug)]
pub enum ProviderError {
    /// 401 — Invalid API key or authentication failure
    Auth(String),
    /// 429 — Rate limit or quota exceeded
    RateLimit(String),
    /// 402 — Payment required or billing issue
    Billing(String),
    /// 500/502/503/504 — Server-side errors
    ServerError(String),
    /// 400 — Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// 404 — Model not found or endpoint not available
    ModelNotFound(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            ProviderError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            ProviderError::Billing(msg) => write!(f, "Billing error: {}", msg),
            ProviderError::ServerError(msg) => write!(f, "Server error: {}", msg),
            ProviderError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderError::ModelNotFound(msg) => write!(f, "Model not found: {}", msg),
            ProviderError::Unknown(msg) => write!(f, "Unknown provider error: {}", msg),
        }
    }
}

impl ProviderError {
    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Auth(_) => Some(401),
            ProviderError::RateLimit(_) => Some(429),
            ProviderError::Billing(_) => Some(402),
            ProviderError::ServerError(_) => Some(500),
            ProviderError::InvalidRequest(_) => Some(400),
            ProviderError::ModelNotFound(_) => Some(404),
            ProviderError::Unknown(_) => None,
        }
    }
}

impl From<ProviderError> for TodoMcpError {
    fn from(err: ProviderError) -> Self {
        TodoMcpError::ProviderTyped(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for todo-mcp operations.
#[derive(Error, Debug)]
pub enum TodoMcpError {
    /// Configuration-related errors (missing API key, bad config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider errors that did not come with an HTTP status (bad response body, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider HTTP failure with classification.
    #[error("Provider error: {0}")]
    ProviderTyped(ProviderError),

    /// The tool service could not be reached or the stream broke.
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON-RPC error returned by the MCP peer.
    #[error("MCP error: {0}")]
    Mcp(String),

    /// Tool execution errors (bad arguments, unknown tool, etc.)
    #[error("Tool error: {0}")]
    Tool(String),

    /// A todo record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Input rejected by the store (blank title, empty patch, bad priority, etc.)
    #[error("{0}")]
    Validation(String),

    /// The provider stopped for a reason the loop does not handle.
    #[error("Unrecognized stop reason: {0}")]
    UnrecognizedStop(String),

    /// Tool requests and results would not pair up in the transcript.
    #[error("Transcript error: {0}")]
    Transcript(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TodoMcpError {
    /// Whether this error is a recoverable tool-level failure.
    ///
    /// Recoverable errors are reported back to the model as error results
    /// instead of failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TodoMcpError::NotFound(_) | TodoMcpError::Validation(_) | TodoMcpError::Tool(_)
        )
    }
}

/// A specialized `Result` type for todo-mcp operations.
pub type Result<T> = std::result::Result<T, TodoMcpError>;
