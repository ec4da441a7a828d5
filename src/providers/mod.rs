//! Providers module - LLM provider adapters (Anthropic, OpenAI)
//!
//! This module defines the `ProviderAdapter` trait and common types for talking
//! to LLM providers. Each adapter translates the normalized
//! [`Transcript`](crate::session::Transcript) into its provider's wire format,
//! issues one completion and classifies the result as a
//! [`CompletionOutcome`].
//!
//! # Example
//!
//! ```rust,ignore
//! use todo_mcp::providers::{ClaudeProvider, CompletionOptions, ProviderAdapter};
//! use todo_mcp::session::Transcript;
//!
//! async fn example() {
//!     let provider = ClaudeProvider::new("your-api-key", "claude-sonnet-4-5-20250929")
//!         .with_options(CompletionOptions::new().with_max_tokens(1000));
//!
//!     let mut transcript = Transcript::new();
//!     transcript.append_user("Hello!");
//!
//!     let outcome = provider.request_completion(&transcript, &[]).await.unwrap();
//!     println!("{:?}", outcome);
//! }
//! ```

pub mod claude;
pub mod openai;
mod types;

use crate::error::ProviderError;

pub use claude::ClaudeProvider;
pub use openai::OpenAIProvider;
pub use types::{CompletionOptions, CompletionOutcome, ProviderAdapter, ToolDescriptor};

/// Parse an HTTP status code and response body into a structured [`ProviderError`].
///
/// Both adapters go through this so they report failures the same way.
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 => ProviderError::Auth(body.to_string()),
        402 => ProviderError::Billing(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        429 => ProviderError::RateLimit(body.to_string()),
        400 => ProviderError::InvalidRequest(body.to_string()),
        500..=599 => ProviderError::ServerError(body.to_string()),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
    }
}
