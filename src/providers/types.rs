//! Provider types for todo-mcp
//!
//! This module defines the `ProviderAdapter` trait and the provider-neutral types
//! that cross it: tool descriptors going in, a classified `CompletionOutcome`
//! coming out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::session::{ToolCallRequest, Transcript};

/// A tool published by the tool service.
///
/// Descriptors are produced at discovery time and stay fixed for the lifetime of
/// a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The name of the tool (unique within a service)
    pub name: String,
    /// Human-readable description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON Schema describing the tool's arguments, when the service publishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ToolDescriptor {
    /// Create a descriptor without an input schema.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: None,
        }
    }

    /// Attach an input schema.
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use todo_mcp::providers::ToolDescriptor;
    ///
    /// let tool = ToolDescriptor::new("get_todo", "Get a todo by ID").with_schema(json!({
    ///     "type": "object",
    ///     "properties": { "id": { "type": "integer" } },
    ///     "required": ["id"]
    /// }));
    /// assert!(tool.input_schema.is_some());
    /// ```
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// How a completion ended, in provider-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// The model wants tools invoked. `text` is any assistant text sent alongside.
    ToolCallsRequested {
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    /// Normal end of turn with the concatenated answer text.
    FinalAnswer(String),
    /// Any other stop signal, carried verbatim.
    Unrecognized(String),
}

/// Options applied to every completion request.
///
/// Use the builder methods to construct options.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling
    pub temperature: Option<f32>,
    /// System prompt sent ahead of the transcript
    pub system_prompt: Option<String>,
}

impl CompletionOptions {
    /// Create new default options.
    ///
    /// # Example
    /// ```
    /// use todo_mcp::providers::CompletionOptions;
    ///
    /// let options = CompletionOptions::new().with_max_tokens(1000);
    /// assert_eq!(options.max_tokens, Some(1000));
    /// assert!(options.system_prompt.is_none());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }
}

/// Trait for LLM provider adapters (Anthropic, OpenAI).
///
/// An adapter owns the translation between the normalized [`Transcript`] and its
/// provider's wire format, issues one completion per call, and classifies the
/// result. It performs no I/O besides that request, so the loop driver stays
/// provider-agnostic.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name (e.g. "anthropic", "openai").
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Request one completion for the whole transcript and classify how it ended.
    ///
    /// # Errors
    /// Transport and HTTP failures, and response bodies that cannot be decoded.
    /// An unexpected stop signal is not an error here; it comes back as
    /// [`CompletionOutcome::Unrecognized`].
    async fn request_completion(
        &self,
        transcript: &Transcript,
        tools: &[ToolDescriptor],
    ) -> Result<CompletionOutcome>;
}
