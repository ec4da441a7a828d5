//! OpenAI provider adapter
//!
//! Implements [`ProviderAdapter`] for OpenAI's Chat Completions API. Tool calls
//! travel on the assistant message as `tool_calls` with JSON-encoded argument
//! strings; each result is its own `role: "tool"` message.
//!
//! # Example
//!
//! ```rust,ignore
//! use todo_mcp::providers::{openai::OpenAIProvider, ProviderAdapter};
//! use todo_mcp::session::Transcript;
//!
//! async fn example() {
//!     let provider = OpenAIProvider::new("your-api-key", "gpt-4o");
//!
//!     let mut transcript = Transcript::new();
//!     transcript.append_user("What is on my list?");
//!
//!     let outcome = provider.request_completion(&transcript, &[]).await.unwrap();
//!     println!("{:?}", outcome);
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TodoMcpError};
use crate::session::{ConversationTurn, ToolCallRequest, Transcript};

use super::{
    parse_provider_error, CompletionOptions, CompletionOutcome, ProviderAdapter, ToolDescriptor,
};

/// The OpenAI API endpoint URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

// ============================================================================
// OpenAI API Request Types
// ============================================================================

/// OpenAI API request body.
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    /// Conversation messages (including system)
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    /// "auto" whenever tools are offered
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// A message in OpenAI's format.
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIMessage {
    /// Role: "system", "user", "assistant", or "tool"
    pub role: String,
    /// Message content (null for an assistant turn with only tool calls)
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
    /// ID of the tool call this message answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl OpenAIMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// A tool call as it appears on an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIToolCall {
    pub id: String,
    /// Always "function"
    #[serde(default = "function_type")]
    pub r#type: String,
    pub function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Function call details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIFunctionCall {
    pub name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: String,
}

/// OpenAI tool definition.
#[derive(Debug, Clone, Serialize)]
pub struct OpenAITool {
    /// Always "function"
    pub r#type: String,
    pub function: OpenAIFunctionDef,
}

/// OpenAI function definition.
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIFunctionDef {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

// ============================================================================
// OpenAI API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

/// Response content is usually a string, but may arrive as a list of parts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

impl ResponseContent {
    fn into_text(self) -> String {
        match self {
            ResponseContent::Text(text) => text,
            ResponseContent::Parts(parts) => parts.into_iter().filter_map(|p| p.text).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
}

// ============================================================================
// OpenAI Provider
// ============================================================================

/// OpenAI provider adapter.
pub struct OpenAIProvider {
    /// API key for authentication
    api_key: String,
    /// Model identifier
    model: String,
    /// API base URL
    api_base: String,
    /// Per-request options
    options: CompletionOptions,
    /// HTTP client for making requests
    client: Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI adapter using the default endpoint.
    ///
    /// # Example
    /// ```
    /// use todo_mcp::providers::openai::OpenAIProvider;
    /// use todo_mcp::providers::ProviderAdapter;
    ///
    /// let provider = OpenAIProvider::new("sk-xxx", "gpt-4o");
    /// assert_eq!(provider.name(), "openai");
    /// assert_eq!(provider.model(), "gpt-4o");
    /// ```
    pub fn new(api_key: &str, model: &str) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(api_key, model, OPENAI_API_URL, client)
    }

    /// Create a new OpenAI adapter with a custom HTTP client and base URL.
    ///
    /// A trailing slash on `api_base` is removed.
    pub fn with_client(api_key: &str, model: &str, api_base: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            options: CompletionOptions::default(),
            client,
        }
    }

    /// Use an OpenAI-compatible endpoint instead of the default one.
    ///
    /// # Example
    /// ```
    /// use todo_mcp::providers::openai::OpenAIProvider;
    ///
    /// let provider = OpenAIProvider::new("sk-xxx", "gpt-4o")
    ///     .with_api_base("http://localhost:11434/v1/");
    /// ```
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Set the options sent with every request.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    fn build_request(&self, transcript: &Transcript, tools: &[ToolDescriptor]) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        if let Some(system) = &self.options.system_prompt {
            messages.push(OpenAIMessage::text("system", system));
        }
        messages.extend(convert_transcript(transcript));

        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (Some(convert_tools(tools)), Some("auto".to_string()))
        };

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            tools,
            tool_choice,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        }
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert the normalized transcript to OpenAI chat messages.
pub fn convert_transcript(transcript: &Transcript) -> Vec<OpenAIMessage> {
    let mut messages = Vec::with_capacity(transcript.len());

    for turn in transcript.turns() {
        match turn {
            ConversationTurn::UserText { text } => {
                messages.push(OpenAIMessage::text("user", text));
            }
            ConversationTurn::AssistantText { text } => {
                messages.push(OpenAIMessage::text("assistant", text));
            }
            ConversationTurn::AssistantToolRequests { text, calls } => {
                let tool_calls = calls
                    .iter()
                    .map(|call| OpenAIToolCall {
                        id: call.call_id.clone(),
                        r#type: function_type(),
                        function: OpenAIFunctionCall {
                            name: call.tool_name.clone(),
                            arguments: call.arguments_json(),
                        },
                    })
                    .collect();
                messages.push(OpenAIMessage {
                    role: "assistant".to_string(),
                    content: text.clone().filter(|t| !t.is_empty()),
                    tool_calls: Some(tool_calls),
                    tool_call_id: None,
                });
            }
            ConversationTurn::ToolResults { results } => {
                for result in results {
                    messages.push(OpenAIMessage {
                        role: "tool".to_string(),
                        content: Some(result.content.clone()),
                        tool_calls: None,
                        tool_call_id: Some(result.call_id.clone()),
                    });
                }
            }
        }
    }

    messages
}

/// Convert tool descriptors to OpenAI's nested function format.
pub fn convert_tools(tools: &[ToolDescriptor]) -> Vec<OpenAITool> {
    tools
        .iter()
        .map(|t| OpenAITool {
            r#type: function_type(),
            function: OpenAIFunctionDef {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

/// Classify an OpenAI response by its first choice.
fn classify_response(response: OpenAIResponse) -> Result<CompletionOutcome> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        TodoMcpError::Provider("OpenAI response contained no choices".to_string())
    })?;

    let text = choice
        .message
        .content
        .map(ResponseContent::into_text)
        .unwrap_or_default();
    let calls: Vec<ToolCallRequest> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallRequest::from_json_str(&tc.id, &tc.function.name, &tc.function.arguments))
        .collect();

    if !calls.is_empty() {
        return Ok(CompletionOutcome::ToolCallsRequested {
            text: (!text.is_empty()).then_some(text),
            calls,
        });
    }

    Ok(match choice.finish_reason.as_deref() {
        Some("stop") | None => CompletionOutcome::FinalAnswer(text),
        Some(other) => CompletionOutcome::Unrecognized(other.to_string()),
    })
}

// ============================================================================
// ProviderAdapter Implementation
// ============================================================================

#[async_trait]
impl ProviderAdapter for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn request_completion(
        &self,
        transcript: &Transcript,
        tools: &[ToolDescriptor],
    ) -> Result<CompletionOutcome> {
        let request = self.build_request(transcript, tools);
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = tools.len(),
            "Sending OpenAI request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();

            let body = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                Ok(error_response) => format!(
                    "OpenAI API error: {} - {}",
                    error_response.error.r#type.unwrap_or_default(),
                    error_response.error.message
                ),
                Err(_) => format!("OpenAI API error: {}", error_text),
            };

            return Err(TodoMcpError::from(parse_provider_error(status, &body)));
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            TodoMcpError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        if let Some(usage) = &openai_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI response received"
            );
        }

        classify_response(openai_response)
    }
}

// ============================================================================
// Tests
// ============================================================================
