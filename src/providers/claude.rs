//! Claude (Anthropic) provider adapter
//!
//! Implements [`ProviderAdapter`] for Anthropic's Messages API. Tool calls are
//! `tool_use` content blocks on the assistant message; their results go back as
//! `tool_result` blocks grouped in a single user message.
//!
//! # Example
//!
//! ```rust,ignore
//! use todo_mcp::providers::{claude::ClaudeProvider, ProviderAdapter};
//! use todo_mcp::session::Transcript;
//!
//! async fn example() {
//!     let provider = ClaudeProvider::new("your-api-key", "claude-sonnet-4-5-20250929");
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
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Result, TodoMcpError};
use crate::session::{CallArguments, ConversationTurn, ToolCallRequest, Transcript};

use super::{
    parse_provider_error, CompletionOptions, CompletionOutcome, ProviderAdapter, ToolDescriptor,
};

/// The Claude API endpoint URL.
const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// The Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Used when no `max_tokens` option is set; the API requires one.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Claude/Anthropic provider adapter.
pub struct ClaudeProvider {
    /// API key for authentication
    api_key: String,
    /// Model identifier
    model: String,
    /// Messages endpoint
    api_url: String,
    /// Per-request options
    options: CompletionOptions,
    /// HTTP client for making requests
    client: Client,
}

impl ClaudeProvider {
    /// Create a new Claude adapter for the given model.
    ///
    /// # Example
    /// ```
    /// use todo_mcp::providers::claude::ClaudeProvider;
    /// use todo_mcp::providers::ProviderAdapter;
    ///
    /// let provider = ClaudeProvider::new("sk-ant-api03-xxx", "claude-sonnet-4-5-20250929");
    /// assert_eq!(provider.name(), "anthropic");
    /// assert_eq!(provider.model(), "claude-sonnet-4-5-20250929");
    /// ```
    pub fn new(api_key: &str, model: &str) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(api_key, model, client)
    }

    /// Create a new Claude adapter with a custom HTTP client.
    pub fn with_client(api_key: &str, model: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_url: CLAUDE_API_URL.to_string(),
            options: CompletionOptions::default(),
            client,
        }
    }

    /// Point the adapter at a different API base (e.g. a proxy).
    ///
    /// `/v1/messages` is appended unless the base already ends with it.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        let base = api_base.trim_end_matches('/');
        self.api_url = if base.ends_with("/v1/messages") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/messages", base)
        } else {
            format!("{}/v1/messages", base)
        };
        self
    }

    /// Set the options sent with every request.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    fn build_request(&self, transcript: &Transcript, tools: &[ToolDescriptor]) -> ClaudeRequest {
        ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: convert_transcript(transcript),
            system: self.options.system_prompt.clone(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(convert_tools(tools))
            },
            temperature: self.options.temperature,
        }
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeProvider {
    fn name(&self) -> &str {
        "anthropic"
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
            "Sending Claude request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();

            let body = if let Ok(error_response) =
                serde_json::from_str::<ClaudeErrorResponse>(&error_text)
            {
                format!(
                    "Claude API error: {} - {}",
                    error_response.error.r#type, error_response.error.message
                )
            } else {
                format!("Claude API error: {}", error_text)
            };

            return Err(TodoMcpError::from(parse_provider_error(status, &body)));
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| TodoMcpError::Provider(format!("Invalid Claude response: {}", e)))?;

        if let Some(usage) = &claude_response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = ?claude_response.stop_reason,
                "Claude response received"
            );
        }

        Ok(classify_response(claude_response))
    }
}

// ============================================================================
// Claude API Request Types
// ============================================================================

/// Claude API request body.
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
    /// System prompt (separate from messages in Claude API)
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ClaudeTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// A message in Claude's format.
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeMessage {
    /// Role: "user" or "assistant"
    pub role: String,
    pub content: ClaudeContent,
}

/// Claude message content - simple text or content blocks.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClaudeContent {
    Text(String),
    Blocks(Vec<ClaudeContentBlock>),
}

/// A content block within a request message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClaudeContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    /// Assistant requesting a tool call
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// Result of a tool call, sent in a user message
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Claude tool definition.
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeTool {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

// ============================================================================
// Claude API Response Types
// ============================================================================

/// Claude API response body.
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<ClaudeUsage>,
    /// Stop reason (e.g., "end_turn", "tool_use")
    #[serde(default)]
    stop_reason: Option<String>,
}

/// A content block in a response. Block types this client does not use are skipped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Claude API error response.
#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
    error: ClaudeError,
}

#[derive(Debug, Deserialize)]
struct ClaudeError {
    r#type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert tool descriptors to Claude's flat tool format.
pub fn convert_tools(tools: &[ToolDescriptor]) -> Vec<ClaudeTool> {
    tools
        .iter()
        .map(|t| ClaudeTool {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.input_schema.clone(),
        })
        .collect()
}

/// Convert the normalized transcript to Claude messages.
///
/// Tool results become one user message of `tool_result` blocks. A user text that
/// follows them is added to that same message, since the API expects user and
/// assistant roles to alternate. Empty assistant answers are dropped, which can
/// leave two user texts adjacent; those are merged the same way.
pub fn convert_transcript(transcript: &Transcript) -> Vec<ClaudeMessage> {
    let mut messages: Vec<ClaudeMessage> = Vec::with_capacity(transcript.len());

    for turn in transcript.turns() {
        match turn {
            ConversationTurn::UserText { text } => {
                if let Some(last) = messages.last_mut().filter(|m| m.role == "user") {
                    let block = ClaudeContentBlock::Text { text: text.clone() };
                    let mut blocks =
                        match std::mem::replace(&mut last.content, ClaudeContent::Blocks(Vec::new())) {
                            ClaudeContent::Blocks(blocks) => blocks,
                            ClaudeContent::Text(previous) => {
                                vec![ClaudeContentBlock::Text { text: previous }]
                            }
                        };
                    blocks.push(block);
                    last.content = ClaudeContent::Blocks(blocks);
                    continue;
                }
                messages.push(ClaudeMessage {
                    role: "user".to_string(),
                    content: ClaudeContent::Text(text.clone()),
                });
            }
            // The API rejects empty assistant content
            ConversationTurn::AssistantText { text } if text.trim().is_empty() => {}
            ConversationTurn::AssistantText { text } => {
                messages.push(ClaudeMessage {
                    role: "assistant".to_string(),
                    content: ClaudeContent::Text(text.clone()),
                });
            }
            ConversationTurn::AssistantToolRequests { text, calls } => {
                let mut blocks: Vec<ClaudeContentBlock> = Vec::with_capacity(calls.len() + 1);
                if let Some(text) = text.as_ref().filter(|t| !t.is_empty()) {
                    blocks.push(ClaudeContentBlock::Text { text: text.clone() });
                }
                blocks.extend(calls.iter().map(tool_use_block));
                messages.push(ClaudeMessage {
                    role: "assistant".to_string(),
                    content: ClaudeContent::Blocks(blocks),
                });
            }
            ConversationTurn::ToolResults { results } => {
                let blocks = results
                    .iter()
                    .map(|r| ClaudeContentBlock::ToolResult {
                        tool_use_id: r.call_id.clone(),
                        content: r.content.clone(),
                        is_error: r.is_error.then_some(true),
                    })
                    .collect();
                messages.push(ClaudeMessage {
                    role: "user".to_string(),
                    content: ClaudeContent::Blocks(blocks),
                });
            }
        }
    }

    messages
}

fn tool_use_block(call: &ToolCallRequest) -> ClaudeContentBlock {
    let input = match &call.arguments {
        CallArguments::Parsed { arguments } => Value::Object(arguments.clone()),
        // tool_use input must be an object
        CallArguments::Malformed { .. } => json!({}),
    };
    ClaudeContentBlock::ToolUse {
        id: call.call_id.clone(),
        name: call.tool_name.clone(),
        input,
    }
}

/// Classify a Claude response by its stop reason.
fn classify_response(response: ClaudeResponse) -> CompletionOutcome {
    let mut text = String::new();
    let mut calls: Vec<ToolCallRequest> = Vec::new();

    for block in response.content {
        match block {
            ResponseBlock::Text { text: part } => text.push_str(&part),
            ResponseBlock::ToolUse { id, name, input } => {
                calls.push(ToolCallRequest::from_value(&id, &name, input));
            }
            ResponseBlock::Other => {}
        }
    }

    match response.stop_reason.as_deref() {
        Some("tool_use") if !calls.is_empty() => CompletionOutcome::ToolCallsRequested {
            text: (!text.is_empty()).then_some(text),
            calls,
        },
        Some("end_turn") => CompletionOutcome::FinalAnswer(text),
        Some(other) => CompletionOutcome::Unrecognized(other.to_string()),
        None => CompletionOutcome::Unrecognized("missing stop_reason".to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
