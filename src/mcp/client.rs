//! MCP client over the SSE transport
//!
//! The client holds one long-lived `GET` event stream per session. The server
//! first announces, in an `endpoint` event, the URL requests must be POSTed to;
//! responses then come back as `message` events on the stream. A background
//! reader task routes each response to the waiter registered under its id.
//!
//! ```text
//!   McpClient::request ──POST──▶ {endpoint}            (202 Accepted)
//!          ▲
//!          │ oneshot by id
//!          │
//!   reader task ◀──SSE── GET {server_url}   event: endpoint | message
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, TodoMcpError};
use crate::providers::ToolDescriptor;
use crate::session::ToolArguments;
use crate::tools::{ToolOutput, ToolService};

use super::protocol::{
    methods, CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    ListToolsParams, ListToolsResult, McpMessage, McpNotification, McpRequest, McpResponse,
    RequestId, MCP_PROTOCOL_VERSION,
};

type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<McpResponse>>>>;

/// Upper bound on `tools/list` pages, in case a server keeps returning cursors.
const MAX_LIST_PAGES: usize = 100;

// ============================================================================
// SSE decoding
// ============================================================================

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (`message` when the server does not name one)
    pub event: String,
    /// Data lines joined with `\n`
    pub data: String,
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Bytes are buffered until a blank line closes an event, so chunks may split
/// lines or multi-byte characters anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&block[..end]);
            if let Some(event) = parse_sse_event(&text) {
                events.push(event);
            }
        }
        events
    }
}

fn find_blank_line(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Parse one event block. Blocks with no data lines (comments, keep-alives) yield `None`.
pub fn parse_sse_event(block: &str) -> Option<SseEvent> {
    let mut event = String::from("message");
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = value.to_string(),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

// ============================================================================
// Client
// ============================================================================

/// MCP client session over SSE.
pub struct McpClient {
    http: Client,
    endpoint: Url,
    timeout: Duration,
    next_id: AtomicI64,
    pending: PendingMap,
    reader: JoinHandle<()>,
    closed: AtomicBool,
    server_info: Option<Implementation>,
}

impl McpClient {
    /// Open the event stream, wait for the POST endpoint and run the
    /// `initialize` handshake.
    ///
    /// # Errors
    /// Returns [`TodoMcpError::Transport`] when the server cannot be reached,
    /// does not announce an endpoint within `timeout`, or fails the handshake.
    pub async fn connect(server_url: &str, timeout: Duration) -> Result<Self> {
        let sse_url = Url::parse(server_url).map_err(|e| {
            TodoMcpError::Config(format!("Invalid MCP server URL '{}': {}", server_url, e))
        })?;

        let http = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TodoMcpError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let response = http
            .get(sse_url.clone())
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| {
                TodoMcpError::Transport(format!("Failed to connect to {}: {}", sse_url, e))
            })?;

        if !response.status().is_success() {
            return Err(TodoMcpError::Transport(format!(
                "SSE connection to {} failed with status {}",
                sse_url,
                response.status()
            )));
        }

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = tokio::spawn(read_events(
            response.bytes_stream(),
            Arc::clone(&pending),
            endpoint_tx,
        ));

        let endpoint_path = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(path)) => path,
            Ok(Err(_)) => {
                reader.abort();
                return Err(TodoMcpError::Transport(
                    "Event stream closed before the server sent its endpoint".to_string(),
                ));
            }
            Err(_) => {
                reader.abort();
                return Err(TodoMcpError::Transport(format!(
                    "Timed out after {:?} waiting for the MCP endpoint event",
                    timeout
                )));
            }
        };

        let endpoint = match sse_url.join(endpoint_path.trim()) {
            Ok(url) => url,
            Err(e) => {
                reader.abort();
                return Err(TodoMcpError::Transport(format!(
                    "Invalid endpoint '{}' from server: {}",
                    endpoint_path, e
                )));
            }
        };
        debug!(endpoint = %endpoint, "MCP endpoint announced");

        let mut client = Self {
            http,
            endpoint,
            timeout,
            next_id: AtomicI64::new(1),
            pending,
            reader,
            closed: AtomicBool::new(false),
            server_info: None,
        };
        client.initialize().await?;
        Ok(client)
    }

    /// Server name and version reported during the handshake.
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    async fn initialize(&mut self) -> Result<()> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation::this_crate("todo-mcp-client"),
        };
        let result: InitializeResult = self.request(methods::INITIALIZE, &params).await?;
        info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            protocol = %result.protocol_version,
            "Connected to MCP server"
        );
        self.server_info = Some(result.server_info);

        self.notify(methods::INITIALIZED).await
    }

    /// List all tools, following `nextCursor` pages.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = ListToolsParams {
                cursor: cursor.take(),
            };
            let page: ListToolsResult = self.request(methods::TOOLS_LIST, &params).await?;
            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        warn!(pages = MAX_LIST_PAGES, "tools/list kept paging, stopping");
        Ok(tools)
    }

    /// Call a tool and return its raw result.
    pub async fn call_tool(&self, name: &str, arguments: ToolArguments) -> Result<CallToolResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        self.request(methods::TOOLS_CALL, &params).await
    }

    /// Stop the reader task and fail every request still waiting for a response.
    pub async fn disconnect(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.reader.abort();
        let dropped = {
            let mut pending = self.pending.lock().await;
            let count = pending.len();
            pending.clear();
            count
        };
        debug!(pending = dropped, "MCP client disconnected");
    }

    async fn request<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        if self.closed.load(Ordering::SeqCst) || self.reader.is_finished() {
            return Err(TodoMcpError::Transport(
                "MCP event stream is closed".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = McpRequest::new(id, method).with_params(serde_json::to_value(params)?);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.post(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(TodoMcpError::Transport(format!(
                    "Connection closed while waiting for {} response",
                    method
                )))
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(TodoMcpError::Transport(format!(
                    "Timed out after {:?} waiting for {} response",
                    self.timeout, method
                )));
            }
        };

        let result = response
            .into_result()
            .map_err(|e| TodoMcpError::Mcp(format!("{} failed: {}", method, e)))?;
        serde_json::from_value(result)
            .map_err(|e| TodoMcpError::Mcp(format!("Unexpected {} result: {}", method, e)))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        self.post(&McpNotification::new(method)).await
    }

    async fn post<T: Serialize>(&self, message: &T) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(message)
            .send()
            .await
            .map_err(|e| TodoMcpError::Transport(format!("Failed to send MCP message: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TodoMcpError::Transport(format!(
                "MCP server rejected message ({}): {}",
                status, body
            )));
        }
        Ok(())
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl ToolService for McpClient {
    async fn discover(&self) -> Result<Vec<ToolDescriptor>> {
        self.list_tools().await
    }

    async fn invoke(&self, name: &str, arguments: ToolArguments) -> Result<ToolOutput> {
        let result = self.call_tool(name, arguments).await?;
        Ok(tool_output(&result))
    }

    async fn close(&self) -> Result<()> {
        self.disconnect().await;
        Ok(())
    }
}

/// Flatten a `tools/call` result into text.
fn tool_output(result: &CallToolResult) -> ToolOutput {
    let text = result.joined_text();
    if result.is_error {
        ToolOutput::error(if text.is_empty() {
            "MCP tool returned error".to_string()
        } else {
            text
        })
    } else {
        ToolOutput::success(if text.is_empty() {
            "(no output)".to_string()
        } else {
            text
        })
    }
}

/// Reader task: decode the event stream and dispatch events.
async fn read_events<S, B, E>(stream: S, pending: PendingMap, endpoint_tx: oneshot::Sender<String>)
where
    S: futures::Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    futures::pin_mut!(stream);
    let mut decoder = SseDecoder::new();
    let mut endpoint_tx = Some(endpoint_tx);

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "MCP event stream error");
                break;
            }
        };

        for event in decoder.push(chunk.as_ref()) {
            match event.event.as_str() {
                "endpoint" => match endpoint_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(event.data);
                    }
                    None => debug!(data = %event.data, "Ignoring repeated endpoint event"),
                },
                "message" => dispatch_message(&event.data, &pending).await,
                other => debug!(event = other, "Ignoring SSE event"),
            }
        }
    }

    debug!("MCP event stream ended");
    // Dropping the senders wakes every waiter with an error.
    pending.lock().await.clear();
}

async fn dispatch_message(data: &str, pending: &PendingMap) {
    let message: McpMessage = match serde_json::from_str(data) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Unparseable MCP message");
            return;
        }
    };

    match message {
        McpMessage::Response(response) => {
            let RequestId::Number(id) = response.id else {
                warn!(id = %response.id, "Response with unexpected id");
                return;
            };
            match pending.lock().await.remove(&id) {
                Some(tx) => {
                    let _ = tx.send(response);
                }
                None => debug!(id, "Response for unknown or expired request"),
            }
        }
        McpMessage::Notification(notification) => {
            debug!(method = %notification.method, "MCP notification");
        }
        McpMessage::Request(request) => {
            debug!(method = %request.method, "Ignoring server-initiated request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::protocol::McpContent;

    #[test]
    fn test_parse_sse_event_endpoint() {
        let event = parse_sse_event("event: endpoint\ndata: /messages/?session_id=abc").unwrap();
        assert_eq!(event.event, "endpoint");
        assert_eq!(event.data, "/messages/?session_id=abc");
    }

    #[test]
    fn test_parse_sse_event_defaults_to_message() {
        let event = parse_sse_event("data: {\"a\":1}").unwrap();
        assert_eq!(event.event, "message");
        assert_eq!(event.data, "{\"a\":1}");
    }

    #[test]
    fn test_parse_sse_event_multiline_data() {
        let event = parse_sse_event("data: one\ndata:two").unwrap();
        assert_eq!(event.data, "one\ntwo");
    }

    #[test]
    fn test_parse_sse_event_comment_only() {
        assert!(parse_sse_event(": keep-alive").is_none());
        assert!(parse_sse_event("event: ping").is_none());
    }

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: endp").is_empty());
        assert!(decoder.push(b"oint\ndata: /messages/").is_empty());

        let events = decoder.push(b"\n\nevent: message\ndata: {}\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "endpoint");
        assert_eq!(events[0].data, "/messages/");
        assert_eq!(events[1].event, "message");
    }

    #[test]
    fn test_decoder_crlf_and_utf8_split() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: caf\u{e9}\r\n\r\n".as_bytes();
        // Split inside the two-byte 'é'
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        let events = decoder.push(&bytes[split..]);
        assert_eq!(events[0].data, "caf\u{e9}");
    }

    #[test]
    fn test_tool_output_mapping() {
        let ok = tool_output(&CallToolResult::text("done", false));
        assert_eq!(ok, ToolOutput::success("done"));

        let empty = tool_output(&CallToolResult {
            content: vec![],
            is_error: false,
        });
        assert_eq!(empty.content, "(no output)");

        let err = tool_output(&CallToolResult {
            content: vec![McpContent::Unsupported],
            is_error: true,
        });
        assert!(err.is_error);
        assert_eq!(err.content, "MCP tool returned error");

        let joined = tool_output(&CallToolResult {
            content: vec![
                McpContent::Text { text: "a".into() },
                McpContent::Text { text: "b".into() },
            ],
            is_error: false,
        });
        assert_eq!(joined.content, "a\nb");
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_id() {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = oneshot::channel();
        pending.lock().await.insert(7, tx);

        dispatch_message(r#"{"jsonrpc":"2.0","id":7,"result":{"ok":true}}"#, &pending).await;

        let response = rx.await.unwrap();
        assert_eq!(response.into_result().unwrap()["ok"], true);
        assert!(pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_reader_announces_endpoint_and_fails_waiters_on_close() {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (waiter_tx, waiter_rx) = oneshot::channel();
        pending.lock().await.insert(1, waiter_tx);

        let chunks: Vec<std::result::Result<&'static [u8], String>> =
            vec![Ok(&b"event: endpoint\ndata: /messages/?session_id=x\n\n"[..])];
        let (endpoint_tx, endpoint_rx) = oneshot::channel();

        read_events(futures::stream::iter(chunks), Arc::clone(&pending), endpoint_tx).await;

        assert_eq!(endpoint_rx.await.unwrap(), "/messages/?session_id=x");
        assert!(waiter_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_connect_unreachable_is_transport_error() {
        let result = McpClient::connect("http://127.0.0.1:1/sse", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(TodoMcpError::Transport(_))));
    }

    #[tokio::test]
    async fn test_connect_invalid_url_is_config_error() {
        let result = McpClient::connect("not a url", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(TodoMcpError::Config(_))));
    }
}
