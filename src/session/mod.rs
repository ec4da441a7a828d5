//! Session module - conversation transcript
//!
//! The [`Transcript`] is the ordered, append-only history of one chat session in
//! provider-neutral form. It lives for the whole session so a later query picks up
//! where the previous one stopped.
//!
//! Tool requests and their results are appended together through
//! [`Transcript::append_tool_round`], which refuses a round whose results do not
//! pair one-to-one with the requested call ids. Providers reject transcripts with a
//! dangling or duplicated tool result.
//!
//! # Example
//!
//! ```
//! use todo_mcp::session::{ToolCallRequest, ToolCallResult, Transcript};
//!
//! let mut transcript = Transcript::new();
//! transcript.append_user("show my todos");
//!
//! let call = ToolCallRequest::from_json_str("call_1", "list_todos", "{}");
//! let result = ToolCallResult::success("call_1", "[]");
//! transcript.append_tool_round(None, vec![call], vec![result]).unwrap();
//! transcript.append_assistant_text("You have no todos.");
//!
//! assert_eq!(transcript.len(), 4);
//! ```

pub mod types;

pub use types::{
    CallArguments, ConversationTurn, ToolArguments, ToolCallRequest, ToolCallResult,
};

use crate::error::{Result, TodoMcpError};

/// Ordered conversation history.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a user message.
    pub fn append_user(&mut self, text: &str) {
        self.turns.push(ConversationTurn::UserText {
            text: text.to_string(),
        });
    }

    /// Append a final assistant answer.
    pub fn append_assistant_text(&mut self, text: &str) {
        self.turns.push(ConversationTurn::AssistantText {
            text: text.to_string(),
        });
    }

    /// Append an assistant tool-request turn together with its results.
    ///
    /// # Errors
    /// Returns [`TodoMcpError::Transcript`] without appending anything when the
    /// results do not answer every call id exactly once.
    pub fn append_tool_round(
        &mut self,
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
        results: Vec<ToolCallResult>,
    ) -> Result<()> {
        check_pairing(&calls, &results)?;
        self.turns.push(ConversationTurn::AssistantToolRequests { text, calls });
        self.turns.push(ConversationTurn::ToolResults { results });
        Ok(())
    }

    /// Drop every turn after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }
}

fn check_pairing(calls: &[ToolCallRequest], results: &[ToolCallResult]) -> Result<()> {
    if calls.is_empty() {
        return Err(TodoMcpError::Transcript(
            "a tool round needs at least one call".to_string(),
        ));
    }

    let mut requested: Vec<&str> = calls.iter().map(|c| c.call_id.as_str()).collect();
    let mut answered: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
    requested.sort_unstable();
    answered.sort_unstable();

    if requested != answered {
        return Err(TodoMcpError::Transcript(format!(
            "tool results {:?} do not match requested calls {:?}",
            answered, requested
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest::from_json_str(id, "list_todos", "{}")
    }

    #[test]
    fn test_new_transcript_is_empty() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.len(), 0);
    }

    #[test]
    fn test_append_user_and_answer() {
        let mut transcript = Transcript::new();
        transcript.append_user("hello");
        transcript.append_assistant_text("hi");

        assert_eq!(
            transcript.turns(),
            &[
                ConversationTurn::UserText {
                    text: "hello".to_string()
                },
                ConversationTurn::AssistantText {
                    text: "hi".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_tool_round_results_in_any_order() {
        let mut transcript = Transcript::new();
        transcript
            .append_tool_round(
                Some("Checking.".to_string()),
                vec![call("a"), call("b")],
                vec![
                    ToolCallResult::success("b", "2"),
                    ToolCallResult::success("a", "1"),
                ],
            )
            .unwrap();

        assert_eq!(transcript.len(), 2);
        assert!(matches!(
            transcript.turns()[1],
            ConversationTurn::ToolResults { ref results } if results.len() == 2
        ));
    }

    #[test]
    fn test_tool_round_missing_result_rejected() {
        let mut transcript = Transcript::new();
        let err = transcript
            .append_tool_round(
                None,
                vec![call("a"), call("b")],
                vec![ToolCallResult::success("a", "1")],
            )
            .unwrap_err();

        assert!(matches!(err, TodoMcpError::Transcript(_)));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_tool_round_duplicate_result_rejected() {
        let mut transcript = Transcript::new();
        let result = transcript.append_tool_round(
            None,
            vec![call("a")],
            vec![
                ToolCallResult::success("a", "1"),
                ToolCallResult::success("a", "again"),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_round_without_calls_rejected() {
        let mut transcript = Transcript::new();
        assert!(transcript.append_tool_round(None, vec![], vec![]).is_err());
    }
}
