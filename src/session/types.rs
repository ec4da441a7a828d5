//! Conversation types for todo-mcp
//!
//! This module defines the provider-neutral form of a conversation: turns, the tool
//! calls a model asks for, and the results fed back to it. Provider adapters convert
//! these to and from their own wire formats.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured tool arguments (a JSON object).
pub type ToolArguments = Map<String, Value>;

/// Arguments of a requested tool call.
///
/// Arguments that could not be parsed into a JSON object are kept verbatim so the
/// call can still be answered with an error result and echoed back to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallArguments {
    /// Well-formed argument object
    Parsed { arguments: ToolArguments },
    /// Unparseable arguments and the reason they were rejected
    Malformed { raw: String, reason: String },
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned identifier, echoed back with the result
    pub call_id: String,
    /// Name of the tool to invoke
    pub tool_name: String,
    /// Call arguments
    pub arguments: CallArguments,
}

impl ToolCallRequest {
    /// Create a request with parsed arguments.
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use todo_mcp::session::ToolCallRequest;
    ///
    /// let args = json!({"title": "Ship release"}).as_object().cloned().unwrap();
    /// let call = ToolCallRequest::new("toolu_01", "create_todo", args);
    /// assert!(call.parsed_arguments().is_some());
    /// ```
    pub fn new(call_id: &str, tool_name: &str, arguments: ToolArguments) -> Self {
        Self {
            call_id: call_id.to_string(),
            tool_name: tool_name.to_string(),
            arguments: CallArguments::Parsed { arguments },
        }
    }

    /// Create a request whose arguments could not be parsed.
    pub fn malformed(call_id: &str, tool_name: &str, raw: &str, reason: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            tool_name: tool_name.to_string(),
            arguments: CallArguments::Malformed {
                raw: raw.to_string(),
                reason: reason.to_string(),
            },
        }
    }

    /// Build a request from a JSON value, which must be an object.
    pub fn from_value(call_id: &str, tool_name: &str, value: Value) -> Self {
        match value {
            Value::Object(arguments) => Self::new(call_id, tool_name, arguments),
            // A missing input is an empty argument list.
            Value::Null => Self::new(call_id, tool_name, Map::new()),
            other => Self::malformed(
                call_id,
                tool_name,
                &other.to_string(),
                "arguments must be a JSON object",
            ),
        }
    }

    /// Build a request from JSON-encoded argument text.
    ///
    /// # Example
    /// ```
    /// use todo_mcp::session::ToolCallRequest;
    ///
    /// let ok = ToolCallRequest::from_json_str("call_1", "get_todo", r#"{"id": 3}"#);
    /// assert!(ok.parsed_arguments().is_some());
    ///
    /// let bad = ToolCallRequest::from_json_str("call_2", "get_todo", "{id: 3");
    /// assert!(bad.parsed_arguments().is_none());
    /// ```
    pub fn from_json_str(call_id: &str, tool_name: &str, raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::new(call_id, tool_name, Map::new());
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(arguments)) => Self::new(call_id, tool_name, arguments),
            Ok(_) => Self::malformed(call_id, tool_name, raw, "arguments must be a JSON object"),
            Err(e) => Self::malformed(call_id, tool_name, raw, &e.to_string()),
        }
    }

    /// The parsed arguments, if they were well-formed.
    pub fn parsed_arguments(&self) -> Option<&ToolArguments> {
        match &self.arguments {
            CallArguments::Parsed { arguments } => Some(arguments),
            CallArguments::Malformed { .. } => None,
        }
    }

    /// Arguments as JSON text (the original text when malformed).
    pub fn arguments_json(&self) -> String {
        match &self.arguments {
            CallArguments::Parsed { arguments } => {
                serde_json::to_string(arguments).unwrap_or_else(|_| "{}".to_string())
            }
            CallArguments::Malformed { raw, .. } => raw.clone(),
        }
    }
}

/// The outcome of one tool call, as fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Identifier of the request this answers
    pub call_id: String,
    /// Result text (structured output is serialized before it gets here)
    pub content: String,
    /// Whether the call failed
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn success(call_id: &str, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.to_string(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: &str, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.to_string(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationTurn {
    /// User input
    UserText { text: String },
    /// Assistant answer without tool calls
    AssistantText { text: String },
    /// Assistant turn that requested tools, with any text that came with it
    AssistantToolRequests {
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    /// Results for the preceding tool requests
    ToolResults { results: Vec<ToolCallResult> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_str_parses_object() {
        let call = ToolCallRequest::from_json_str("c1", "create_todo", r#"{"title":"x"}"#);
        let args = call.parsed_arguments().unwrap();
        assert_eq!(args.get("title"), Some(&json!("x")));
    }

    #[test]
    fn test_from_json_str_empty_is_empty_object() {
        let call = ToolCallRequest::from_json_str("c1", "list_todos", "");
        assert!(call.parsed_arguments().unwrap().is_empty());
    }

    #[test]
    fn test_from_json_str_invalid_keeps_raw() {
        let call = ToolCallRequest::from_json_str("c1", "get_todo", "{\"id\": ");
        match &call.arguments {
            CallArguments::Malformed { raw, reason } => {
                assert_eq!(raw, "{\"id\": ");
                assert!(!reason.is_empty());
            }
            other => panic!("expected malformed, got {:?}", other),
        }
        assert_eq!(call.arguments_json(), "{\"id\": ");
    }

    #[test]
    fn test_from_json_str_non_object() {
        let call = ToolCallRequest::from_json_str("c1", "get_todo", "[1, 2]");
        assert!(call.parsed_arguments().is_none());
    }

    #[test]
    fn test_from_value() {
        let ok = ToolCallRequest::from_value("c1", "get_todo", json!({"id": 1}));
        assert!(ok.parsed_arguments().is_some());

        let null = ToolCallRequest::from_value("c2", "list_todos", Value::Null);
        assert!(null.parsed_arguments().unwrap().is_empty());

        let bad = ToolCallRequest::from_value("c3", "get_todo", json!("id=1"));
        assert!(bad.parsed_arguments().is_none());
    }

    #[test]
    fn test_arguments_json_roundtrip() {
        let call = ToolCallRequest::from_json_str("c1", "get_todo", r#"{"id":7}"#);
        assert_eq!(call.arguments_json(), r#"{"id":7}"#);
    }

    #[test]
    fn test_tool_call_result_constructors() {
        let ok = ToolCallResult::success("c1", "done");
        assert!(!ok.is_error);
        let err = ToolCallResult::error("c2", "boom");
        assert!(err.is_error);
        assert_eq!(err.call_id, "c2");
    }

    #[test]
    fn test_turn_serde_tag() {
        let turn = ConversationTurn::UserText {
            text: "hi".to_string(),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["type"], "user_text");
    }
}
