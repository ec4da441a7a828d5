//! MCP server over the SSE transport
//!
//! Publishes a [`ToolService`] (normally the todo tool registry) to MCP
//! clients:
//!
//! - `GET /sse` opens a session and sends an `endpoint` event naming
//!   `/messages/?session_id=<uuid>`
//! - `POST /messages/?session_id=<uuid>` accepts one JSON-RPC message and
//!   answers `202 Accepted`; the JSON-RPC response goes out on the session's
//!   event stream as a `message` event
//!
//! A session lives as long as its event stream. Shutting the server down ends
//! every open stream so graceful shutdown can complete.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::error::{Result, TodoMcpError};
use crate::tools::ToolService;

use super::protocol::{
    methods, CallToolParams, CallToolResult, Implementation, InitializeResult, ListToolsResult,
    McpMessage, McpRequest, McpResponse, McpRpcError, McpTool, MCP_PROTOCOL_VERSION,
};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "todo-mcp";

/// Path clients POST messages to; the session id goes in the query string.
pub const MESSAGES_PATH: &str = "/messages/";

const SESSION_BUFFER: usize = 64;

type Sessions = Arc<Mutex<HashMap<String, mpsc::Sender<Event>>>>;

#[derive(Clone)]
struct ServerState {
    service: Arc<dyn ToolService>,
    sessions: Sessions,
    shutdown: watch::Receiver<bool>,
}

fn lock(sessions: &Sessions) -> MutexGuard<'_, HashMap<String, mpsc::Sender<Event>>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the session when its event stream is dropped.
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        lock(&self.sessions).remove(&self.id);
        crate::log_component!(debug, "mcp", "Session closed", session_id = self.id.as_str());
    }
}

struct SessionStream {
    events: mpsc::Receiver<Event>,
    shutdown: watch::Receiver<bool>,
    _guard: SessionGuard,
}

/// An MCP server bound to a listener.
pub struct McpServer {
    listener: TcpListener,
    service: Arc<dyn ToolService>,
}

impl McpServer {
    /// Bind to `host:port`. Port 0 picks a free port.
    pub async fn bind(host: &str, port: u16, service: Arc<dyn ToolService>) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            TodoMcpError::Transport(format!("Failed to bind {}:{}: {}", host, port, e))
        })?;
        Ok(Self { listener, service })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let app = router(self.service, stop_rx);

        info!(addr = %addr, "MCP server listening on http://{}/sse", addr);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("MCP server shutting down");
                let _ = stop_tx.send(true);
            })
            .await?;
        Ok(())
    }
}

fn router(service: Arc<dyn ToolService>, shutdown: watch::Receiver<bool>) -> Router {
    let state = ServerState {
        service,
        sessions: Arc::new(Mutex::new(HashMap::new())),
        shutdown,
    };

    Router::new()
        .route("/sse", get(open_session))
        .route(MESSAGES_PATH, post(post_message))
        .route("/messages", post(post_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn open_session(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel(SESSION_BUFFER);
    lock(&state.sessions).insert(session_id.clone(), tx);
    crate::log_component!(debug, "mcp", "Session opened", session_id = session_id.as_str());

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?session_id={}", MESSAGES_PATH, session_id));

    let session = SessionStream {
        events: rx,
        shutdown: state.shutdown.clone(),
        _guard: SessionGuard {
            id: session_id,
            sessions: Arc::clone(&state.sessions),
        },
    };

    let messages = stream::unfold(session, |mut session| async move {
        if *session.shutdown.borrow() {
            return None;
        }
        tokio::select! {
            event = session.events.recv() => event.map(|event| (Ok(event), session)),
            _ = session.shutdown.changed() => None,
        }
    });

    Sse::new(stream::once(async move { Ok(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

async fn post_message(
    State(state): State<ServerState>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Response {
    let sender = lock(&state.sessions).get(&query.session_id).cloned();
    let Some(sender) = sender else {
        return (StatusCode::NOT_FOUND, "Unknown session").into_response();
    };

    let message: McpMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Invalid MCP message");
            return (StatusCode::BAD_REQUEST, format!("Invalid JSON-RPC message: {}", e))
                .into_response();
        }
    };

    match message {
        McpMessage::Request(request) => {
            let service = Arc::clone(&state.service);
            tokio::spawn(async move {
                let response = handle_request(service.as_ref(), request).await;
                let event = match serde_json::to_string(&response) {
                    Ok(data) => Event::default().event("message").data(data),
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize MCP response");
                        return;
                    }
                };
                if sender.send(event).await.is_err() {
                    debug!(id = %response.id, "Session closed before response was delivered");
                }
            });
        }
        McpMessage::Notification(notification) => {
            debug!(method = %notification.method, "MCP notification");
        }
        McpMessage::Response(response) => {
            debug!(id = %response.id, "Ignoring client response");
        }
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

/// Answer one JSON-RPC request.
pub async fn handle_request(service: &dyn ToolService, request: McpRequest) -> McpResponse {
    let id = request.id.clone();
    match dispatch(service, request).await {
        Ok(result) => McpResponse::success(id, result),
        Err(error) => McpResponse::error(id, error),
    }
}

async fn dispatch(
    service: &dyn ToolService,
    request: McpRequest,
) -> std::result::Result<Value, McpRpcError> {
    match request.method.as_str() {
        methods::INITIALIZE => to_value(&InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({ "tools": {} }),
            server_info: Implementation::this_crate(SERVER_NAME),
        }),
        methods::PING => Ok(json!({})),
        methods::TOOLS_LIST => {
            let tools = service
                .discover()
                .await
                .map_err(McpRpcError::internal_error)?;
            to_value(&ListToolsResult {
                tools: tools.into_iter().map(McpTool::from).collect(),
                next_cursor: None,
            })
        }
        methods::TOOLS_CALL => {
            let params: CallToolParams =
                serde_json::from_value(request.params.unwrap_or(Value::Null))
                    .map_err(McpRpcError::invalid_params)?;
            let output = service
                .invoke(&params.name, params.arguments)
                .await
                .map_err(|e| {
                    warn!(tool = %params.name, error = %e, "Tool call failed");
                    McpRpcError::internal_error(e)
                })?;
            to_value(&CallToolResult::text(output.content, output.is_error))
        }
        other => Err(McpRpcError::method_not_found(other)),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> std::result::Result<Value, McpRpcError> {
    serde_json::to_value(value).map_err(McpRpcError::internal_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TodoStore;
    use crate::tools::todo::register_todo_tools;
    use crate::tools::ToolRegistry;

    fn service() -> Arc<dyn ToolService> {
        let mut registry = ToolRegistry::new();
        register_todo_tools(&mut registry, Arc::new(TodoStore::in_memory()));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let response = handle_request(
            service().as_ref(),
            McpRequest::new(1i64, methods::INITIALIZE),
        )
        .await;
        let result = response.into_result().unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_tools_list_publishes_todo_tools() {
        let response = handle_request(
            service().as_ref(),
            McpRequest::new(2i64, methods::TOOLS_LIST),
        )
        .await;
        let result: ListToolsResult =
            serde_json::from_value(response.into_result().unwrap()).unwrap();
        let names: Vec<_> = result.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["list_todos", "create_todo", "update_todo", "delete_todo", "get_todo"]
        );
        assert!(result.tools[0].input_schema.is_some());
    }

    #[tokio::test]
    async fn test_tools_call_create() {
        let request = McpRequest::new(3i64, methods::TOOLS_CALL)
            .with_params(json!({"name": "create_todo", "arguments": {"title": "Ship release"}}));
        let response = handle_request(service().as_ref(), request).await;
        let result: CallToolResult =
            serde_json::from_value(response.into_result().unwrap()).unwrap();
        assert!(!result.is_error);
        assert!(result.joined_text().contains("Ship release"));
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_error_result() {
        let request = McpRequest::new(4i64, methods::TOOLS_CALL)
            .with_params(json!({"name": "nope", "arguments": {}}));
        let response = handle_request(service().as_ref(), request).await;
        let result: CallToolResult =
            serde_json::from_value(response.into_result().unwrap()).unwrap();
        assert!(result.is_error);
        assert!(result.joined_text().contains("Tool not found: nope"));
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let response = handle_request(
            service().as_ref(),
            McpRequest::new(5i64, methods::TOOLS_CALL),
        )
        .await;
        let error = response.into_result().unwrap_err();
        assert_eq!(error.code, McpRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = handle_request(
            service().as_ref(),
            McpRequest::new(6i64, "resources/list"),
        )
        .await;
        let error = response.into_result().unwrap_err();
        assert_eq!(error.code, McpRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ping() {
        let response =
            handle_request(service().as_ref(), McpRequest::new(7i64, methods::PING)).await;
        assert_eq!(response.into_result().unwrap(), json!({}));
    }
}
