//! Tool types for todo-mcp
//!
//! This module defines the `Tool` trait that every tool implements and the
//! `ToolOutput` it returns.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::session::ToolArguments;

/// Result of a tool execution.
///
/// `content` is what the caller (and ultimately the model) sees. Structured
/// payloads are serialized to text before they get here.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Result text
    pub content: String,
    /// Whether this result represents an error condition
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful result.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Error result.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Successful result holding a pretty-printed JSON payload.
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use todo_mcp::tools::ToolOutput;
    ///
    /// let output = ToolOutput::json(&json!({"message": "ok"})).unwrap();
    /// assert!(!output.is_error);
    /// assert!(output.content.contains("\"message\": \"ok\""));
    /// ```
    pub fn json<T: Serialize>(payload: &T) -> Result<Self> {
        Ok(Self::success(serde_json::to_string_pretty(payload)?))
    }

    /// Error result in the `{"error": "..."}` shape the tool service reports.
    pub fn error_json(message: &str) -> Self {
        let body = serde_json::json!({ "error": message });
        Self::error(serde_json::to_string_pretty(&body).unwrap_or_else(|_| message.to_string()))
    }
}

/// Trait that all tools must implement.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use todo_mcp::error::Result;
/// use todo_mcp::session::ToolArguments;
/// use todo_mcp::tools::{Tool, ToolOutput};
///
/// struct PingTool;
///
/// #[async_trait]
/// impl Tool for PingTool {
///     fn name(&self) -> &str { "ping" }
///     fn description(&self) -> &str { "Replies with pong" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({ "type": "object", "properties": {} })
///     }
///     async fn execute(&self, _args: ToolArguments) -> Result<ToolOutput> {
///         Ok(ToolOutput::success("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within a registry.
    fn name(&self) -> &str;

    /// Description sent to the model so it knows when to use the tool.
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// Recoverable failures (bad arguments, missing records) are returned as
    /// `Err` values for which [`TodoMcpError::is_recoverable`] holds; the
    /// registry turns those into error outputs.
    ///
    /// [`TodoMcpError::is_recoverable`]: crate::error::TodoMcpError::is_recoverable
    async fn execute(&self, args: ToolArguments) -> Result<ToolOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_output_success() {
        let output = ToolOutput::success("done");
        assert_eq!(output.content, "done");
        assert!(!output.is_error);
    }

    #[test]
    fn test_tool_output_error_json() {
        let output = ToolOutput::error_json("Todo with ID 3 not found.");
        assert!(output.is_error);

        let parsed: Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(parsed["error"], "Todo with ID 3 not found.");
    }

    #[test]
    fn test_tool_output_json_is_pretty() {
        let output = ToolOutput::json(&json!({"a": 1})).unwrap();
        assert_eq!(output.content, "{\n  \"a\": 1\n}");
    }
}
