//! `serve` command: host the todo tools over MCP/SSE.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use todo_mcp::config::Config;
use todo_mcp::mcp::McpServer;
use todo_mcp::store::TodoStore;
use todo_mcp::tools::{todo::register_todo_tools, ToolRegistry};

pub(crate) async fn cmd_serve(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
    db: Option<PathBuf>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let db_path = db.unwrap_or_else(|| config.db_path());

    let store = TodoStore::open(db_path.clone())
        .await
        .with_context(|| format!("Failed to open todo store at {}", db_path.display()))?;

    let mut registry = ToolRegistry::new();
    register_todo_tools(&mut registry, Arc::new(store));
    info!(tools = ?registry.names(), "Registered todo tools");

    let server = McpServer::bind(&host, port, Arc::new(registry))
        .await
        .with_context(|| format!("Failed to start MCP server on {}:{}", host, port))?;
    let addr = server.local_addr()?;
    eprintln!("Todo MCP server listening on http://{}/sse", addr);

    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .with_context(|| "MCP server failed")?;

    Ok(())
}
