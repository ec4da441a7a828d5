//! MCP over SSE: a real server on an ephemeral port and the client talking to it.

#![cfg(feature = "server")]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use todo_mcp::mcp::{McpClient, McpServer};
use todo_mcp::store::TodoStore;
use todo_mcp::tools::{todo::register_todo_tools, ToolRegistry, ToolService};

const TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    url: String,
    store: Arc<TodoStore>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let store = Arc::new(TodoStore::in_memory());
        let mut registry = ToolRegistry::new();
        register_todo_tools(&mut registry, Arc::clone(&store));

        let server = McpServer::bind("127.0.0.1", 0, Arc::new(registry))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            server
                .serve(async {
                    let _ = stop_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            url: format!("http://{}/sse", addr),
            store,
            stop: Some(stop_tx),
            handle,
        }
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(TIMEOUT, self.handle)
            .await
            .expect("server did not shut down")
            .unwrap();
    }
}

fn args(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn sse_handshake_and_discovery() {
    let server = TestServer::start().await;
    let client = McpClient::connect(&server.url, TIMEOUT).await.unwrap();

    let info = client.server_info().unwrap();
    assert_eq!(info.name, "todo-mcp");

    let tools = client.discover().await.unwrap();
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["list_todos", "create_todo", "update_todo", "delete_todo", "get_todo"]
    );
    assert!(tools.iter().all(|t| t.input_schema.is_some()));
    assert!(tools.iter().all(|t| !t.description.is_empty()));

    client.close().await.unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn sse_tool_calls_reach_the_store() {
    let server = TestServer::start().await;
    let client = McpClient::connect(&server.url, TIMEOUT).await.unwrap();

    let created = client
        .invoke(
            "create_todo",
            args(json!({"title": "Ship release", "priority": "high"})),
        )
        .await
        .unwrap();
    assert!(!created.is_error);
    let body: Value = serde_json::from_str(&created.content).unwrap();
    assert_eq!(body["message"], "Created todo: Ship release (ID: 1)");

    let todo = server.store.get(1).await.unwrap();
    assert_eq!(todo.title, "Ship release");

    let missing = client
        .invoke("get_todo", args(json!({"id": 42})))
        .await
        .unwrap();
    assert!(missing.is_error);
    assert!(missing.content.contains("Todo with ID 42 not found."));

    let unknown = client.invoke("no_such_tool", args(json!({}))).await.unwrap();
    assert!(unknown.is_error);

    client.close().await.unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn sse_concurrent_calls_are_routed_by_id() {
    let server = TestServer::start().await;
    let client = Arc::new(McpClient::connect(&server.url, TIMEOUT).await.unwrap());

    let calls = (0..8).map(|i| {
        let client = Arc::clone(&client);
        async move {
            client
                .invoke("create_todo", args(json!({"title": format!("Task {}", i)})))
                .await
                .unwrap()
        }
    });
    let outputs = futures::future::join_all(calls).await;

    for (i, output) in outputs.iter().enumerate() {
        assert!(!output.is_error);
        let body: Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(body["title"], format!("Task {}", i));
    }
    assert_eq!(server.store.len().await, 8);

    client.close().await.unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn sse_requests_fail_after_disconnect() {
    let server = TestServer::start().await;
    let client = McpClient::connect(&server.url, TIMEOUT).await.unwrap();

    client.disconnect().await;
    let result = client.discover().await;
    assert!(result.is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let server = TestServer::start().await;
    let base = server.url.trim_end_matches("/sse").to_string();

    let response = reqwest::Client::new()
        .post(format!("{}/messages/?session_id=does-not-exist", base))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    server.shutdown().await;
}
