//! Agentic loop driver
//!
//! Runs one user query to completion: ask the provider, dispatch the tools it
//! requests, feed the results back, repeat until it answers or the iteration cap
//! is reached.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TodoMcpError};
use crate::providers::{CompletionOutcome, ProviderAdapter, ToolDescriptor};
use crate::session::{CallArguments, ToolCallRequest, ToolCallResult, Transcript};
use crate::tools::ToolService;

/// Default number of completion round-trips per query.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// How a query ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The model answered.
    Answer(String),
    /// The model was still requesting tools when the cap was reached.
    IterationLimit { iterations: u32 },
}

/// Receives progress while a query runs.
pub trait QueryObserver: Send + Sync {
    /// A tool call is about to be dispatched.
    fn on_tool_call(&self, _call: &ToolCallRequest) {}

    /// A tool call finished.
    fn on_tool_result(&self, _call: &ToolCallRequest, _result: &ToolCallResult) {}
}

/// Observer that ignores everything.
pub struct SilentObserver;

impl QueryObserver for SilentObserver {}

enum LoopState {
    AwaitingCompletion {
        iteration: u32,
    },
    DispatchingTools {
        iteration: u32,
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    Done(String),
    Exhausted {
        iterations: u32,
    },
    Failed(TodoMcpError),
}

impl LoopState {
    fn name(&self) -> &'static str {
        match self {
            Self::AwaitingCompletion { .. } => "awaiting_completion",
            Self::DispatchingTools { .. } => "dispatching_tools",
            Self::Done(_) => "done",
            Self::Exhausted { .. } => "exhausted",
            Self::Failed(_) => "failed",
        }
    }
}

/// Drives provider completions and tool dispatch for one conversation.
pub struct AgentLoop<P: ProviderAdapter> {
    provider: P,
    service: Arc<dyn ToolService>,
    tools: Vec<ToolDescriptor>,
    transcript: Transcript,
    max_iterations: u32,
}

impl<P: ProviderAdapter> AgentLoop<P> {
    /// Create a loop over `service`, advertising `tools` to the provider.
    pub fn new(provider: P, service: Arc<dyn ToolService>, tools: Vec<ToolDescriptor>) -> Self {
        Self {
            provider,
            service,
            tools,
            transcript: Transcript::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the iteration cap (at least 1).
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run a query without progress reporting.
    pub async fn process_query(&mut self, query: &str) -> Result<QueryOutcome> {
        self.process_query_with(query, &SilentObserver).await
    }

    /// Run a query, reporting tool calls to `observer`.
    ///
    /// # Errors
    /// Transport and provider failures, and unrecognized stop reasons, end the
    /// query with an error. The transcript is then restored to what it was
    /// before the query so the session stays usable.
    pub async fn process_query_with(
        &mut self,
        query: &str,
        observer: &dyn QueryObserver,
    ) -> Result<QueryOutcome> {
        let checkpoint = self.transcript.len();
        self.transcript.append_user(query);

        let mut state = LoopState::AwaitingCompletion { iteration: 1 };
        loop {
            debug!(state = state.name(), "Loop state");
            state = match state {
                LoopState::AwaitingCompletion { iteration } => {
                    debug!("Completion {} of {}", iteration, self.max_iterations);
                    match self
                        .provider
                        .request_completion(&self.transcript, &self.tools)
                        .await
                    {
                        Ok(CompletionOutcome::ToolCallsRequested { text, calls }) => {
                            LoopState::DispatchingTools {
                                iteration,
                                text,
                                calls,
                            }
                        }
                        Ok(CompletionOutcome::FinalAnswer(text)) => LoopState::Done(text),
                        Ok(CompletionOutcome::Unrecognized(reason)) => {
                            LoopState::Failed(TodoMcpError::UnrecognizedStop(reason))
                        }
                        Err(e) => LoopState::Failed(e),
                    }
                }
                LoopState::DispatchingTools {
                    iteration,
                    text,
                    calls,
                } => {
                    let results = self.dispatch(&calls, observer).await;
                    if let Err(e) = self.transcript.append_tool_round(text, calls, results) {
                        LoopState::Failed(e)
                    } else if iteration >= self.max_iterations {
                        LoopState::Exhausted {
                            iterations: iteration,
                        }
                    } else {
                        LoopState::AwaitingCompletion {
                            iteration: iteration + 1,
                        }
                    }
                }
                LoopState::Done(text) => {
                    self.transcript.append_assistant_text(&text);
                    return Ok(QueryOutcome::Answer(text));
                }
                LoopState::Exhausted { iterations } => {
                    info!(
                        iterations = iterations,
                        "Tool loop reached maximum iterations without a final answer"
                    );
                    return Ok(QueryOutcome::IterationLimit { iterations });
                }
                LoopState::Failed(e) => {
                    warn!(provider = self.provider.name(), error = %e, "Query failed");
                    self.transcript.truncate(checkpoint);
                    return Err(e);
                }
            };
        }
    }

    /// Dispatch sibling calls concurrently. Results keep request order.
    async fn dispatch(
        &self,
        calls: &[ToolCallRequest],
        observer: &dyn QueryObserver,
    ) -> Vec<ToolCallResult> {
        join_all(calls.iter().map(|call| self.dispatch_one(call, observer))).await
    }

    async fn dispatch_one(
        &self,
        call: &ToolCallRequest,
        observer: &dyn QueryObserver,
    ) -> ToolCallResult {
        observer.on_tool_call(call);

        let result = match &call.arguments {
            CallArguments::Malformed { reason, .. } => {
                warn!(tool = %call.tool_name, call_id = %call.call_id, reason = %reason, "Invalid tool arguments");
                ToolCallResult::error(
                    &call.call_id,
                    format!("Invalid arguments for {}: {}", call.tool_name, reason),
                )
            }
            CallArguments::Parsed { arguments } => {
                info!(tool = %call.tool_name, call_id = %call.call_id, "Executing tool");
                let start = Instant::now();
                match self.service.invoke(&call.tool_name, arguments.clone()).await {
                    Ok(output) => {
                        let latency_ms = start.elapsed().as_millis() as u64;
                        info!(
                            tool = %call.tool_name,
                            call_id = %call.call_id,
                            latency_ms = latency_ms,
                            is_error = output.is_error,
                            "Tool executed"
                        );
                        ToolCallResult {
                            call_id: call.call_id.clone(),
                            content: output.content,
                            is_error: output.is_error,
                        }
                    }
                    Err(e) => {
                        let latency_ms = start.elapsed().as_millis() as u64;
                        error!(
                            tool = %call.tool_name,
                            call_id = %call.call_id,
                            latency_ms = latency_ms,
                            error = %e,
                            "Tool execution failed"
                        );
                        ToolCallResult::error(&call.call_id, format!("Error calling tool: {}", e))
                    }
                }
            }
        };

        observer.on_tool_result(call, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ConversationTurn, ToolArguments};
    use crate::tools::ToolOutput;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedProvider {
        outcomes: Mutex<VecDeque<Result<CompletionOutcome>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<Result<CompletionOutcome>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn request_completion(
            &self,
            _transcript: &Transcript,
            _tools: &[ToolDescriptor],
        ) -> Result<CompletionOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(CompletionOutcome::FinalAnswer("done".into())))
        }
    }

    struct RecordingService {
        invoked: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingService {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                invoked: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl ToolService for RecordingService {
        async fn discover(&self) -> Result<Vec<ToolDescriptor>> {
            Ok(vec![ToolDescriptor::new("echo", "Echo")])
        }

        async fn invoke(&self, name: &str, arguments: ToolArguments) -> Result<ToolOutput> {
            self.invoked.lock().unwrap().push(name.to_string());
            if self.fail {
                return Err(TodoMcpError::Transport("service down".into()));
            }
            Ok(ToolOutput::success(serde_json::to_string(&arguments)?))
        }
    }

    fn echo_call(id: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "echo", json!({"v": id}).as_object().cloned().unwrap())
    }

    fn tool_round(ids: &[&str]) -> Result<CompletionOutcome> {
        Ok(CompletionOutcome::ToolCallsRequested {
            text: None,
            calls: ids.iter().map(|id| echo_call(id)).collect(),
        })
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let provider = ScriptedProvider::new(vec![Ok(CompletionOutcome::FinalAnswer(
            "hello".into(),
        ))]);
        let mut agent = AgentLoop::new(provider, RecordingService::new(false), vec![]);

        let outcome = agent.process_query("hi").await.unwrap();
        assert_eq!(outcome, QueryOutcome::Answer("hello".into()));
        assert_eq!(agent.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let provider = ScriptedProvider::new(vec![
            tool_round(&["a", "b", "c"]),
            Ok(CompletionOutcome::FinalAnswer("all done".into())),
        ]);
        let service = RecordingService::new(false);
        let mut agent = AgentLoop::new(provider, service.clone(), vec![]);

        let outcome = agent.process_query("go").await.unwrap();
        assert_eq!(outcome, QueryOutcome::Answer("all done".into()));
        assert_eq!(service.invoked.lock().unwrap().len(), 3);

        let turns = agent.transcript().turns();
        assert_eq!(turns.len(), 4);
        match &turns[2] {
            ConversationTurn::ToolResults { results } => {
                let ids: Vec<_> = results.iter().map(|r| r.call_id.as_str()).collect();
                assert_eq!(ids, vec!["a", "b", "c"]);
                assert!(results.iter().all(|r| !r.is_error));
            }
            other => panic!("expected tool results, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_iteration_cap_is_exact() {
        let outcomes = (0..20).map(|i| tool_round(&[&format!("c{}", i)])).collect();
        let provider = ScriptedProvider::new(outcomes);
        let mut agent = AgentLoop::new(provider, RecordingService::new(false), vec![]);

        let outcome = agent.process_query("loop forever").await.unwrap();
        assert_eq!(
            outcome,
            QueryOutcome::IterationLimit {
                iterations: DEFAULT_MAX_ITERATIONS
            }
        );
        assert_eq!(
            agent.provider().calls.load(Ordering::SeqCst),
            DEFAULT_MAX_ITERATIONS as usize
        );
        // user turn + one request/result pair per iteration
        assert_eq!(
            agent.transcript().len(),
            1 + 2 * DEFAULT_MAX_ITERATIONS as usize
        );
    }

    #[tokio::test]
    async fn test_custom_iteration_cap() {
        let outcomes = (0..5).map(|i| tool_round(&[&format!("c{}", i)])).collect();
        let provider = ScriptedProvider::new(outcomes);
        let mut agent =
            AgentLoop::new(provider, RecordingService::new(false), vec![]).with_max_iterations(3);

        let outcome = agent.process_query("q").await.unwrap();
        assert_eq!(outcome, QueryOutcome::IterationLimit { iterations: 3 });
        assert_eq!(agent.provider().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_service_error_does_not_stop_loop() {
        let provider = ScriptedProvider::new(vec![
            tool_round(&["x"]),
            Ok(CompletionOutcome::FinalAnswer("recovered".into())),
        ]);
        let mut agent = AgentLoop::new(provider, RecordingService::new(true), vec![]);

        let outcome = agent.process_query("q").await.unwrap();
        assert_eq!(outcome, QueryOutcome::Answer("recovered".into()));

        match &agent.transcript().turns()[2] {
            ConversationTurn::ToolResults { results } => {
                assert!(results[0].is_error);
                assert!(results[0].content.starts_with("Error calling tool:"));
                assert!(results[0].content.contains("service down"));
            }
            other => panic!("expected tool results, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_arguments_not_dispatched() {
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionOutcome::ToolCallsRequested {
                text: Some("Let me try.".into()),
                calls: vec![
                    ToolCallRequest::from_json_str("bad", "echo", "{not json"),
                    echo_call("good"),
                ],
            }),
            Ok(CompletionOutcome::FinalAnswer("ok".into())),
        ]);
        let service = RecordingService::new(false);
        let mut agent = AgentLoop::new(provider, service.clone(), vec![]);

        agent.process_query("q").await.unwrap();
        assert_eq!(*service.invoked.lock().unwrap(), vec!["echo".to_string()]);

        match &agent.transcript().turns()[2] {
            ConversationTurn::ToolResults { results } => {
                assert!(results[0].is_error);
                assert!(results[0].content.starts_with("Invalid arguments for echo:"));
                assert!(!results[1].is_error);
            }
            other => panic!("expected tool results, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unrecognized_stop_fails_and_restores_transcript() {
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionOutcome::FinalAnswer("first".into())),
            tool_round(&["t"]),
            Ok(CompletionOutcome::Unrecognized("max_tokens".into())),
        ]);
        let mut agent = AgentLoop::new(provider, RecordingService::new(false), vec![]);

        agent.process_query("one").await.unwrap();
        assert_eq!(agent.transcript().len(), 2);

        let err = agent.process_query("two").await.unwrap_err();
        assert!(matches!(err, TodoMcpError::UnrecognizedStop(ref r) if r == "max_tokens"));
        assert_eq!(agent.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_provider_error_is_returned() {
        let provider =
            ScriptedProvider::new(vec![Err(TodoMcpError::Provider("boom".into()))]);
        let mut agent = AgentLoop::new(provider, RecordingService::new(false), vec![]);

        let err = agent.process_query("q").await.unwrap_err();
        assert!(matches!(err, TodoMcpError::Provider(_)));
        assert!(agent.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_observer_sees_calls_and_results() {
        struct Counting(AtomicUsize, AtomicUsize);
        impl QueryObserver for Counting {
            fn on_tool_call(&self, _call: &ToolCallRequest) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
            fn on_tool_result(&self, _call: &ToolCallRequest, _result: &ToolCallResult) {
                self.1.fetch_add(1, Ordering::SeqCst);
            }
        }

        let provider = ScriptedProvider::new(vec![tool_round(&["a", "b"])]);
        let mut agent = AgentLoop::new(provider, RecordingService::new(false), vec![]);
        let observer = Counting(AtomicUsize::new(0), AtomicUsize::new(0));

        agent.process_query_with("q", &observer).await.unwrap();
        assert_eq!(observer.0.load(Ordering::SeqCst), 2);
        assert_eq!(observer.1.load(Ordering::SeqCst), 2);
    }
}
