//! Chat session lifecycle: connect, run queries, disconnect.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{info, warn};

use crate::error::Result;
use crate::mcp::McpClient;
use crate::providers::{ProviderAdapter, ToolDescriptor};
use crate::session::Transcript;
use crate::tools::ToolService;

use super::r#loop::{AgentLoop, QueryObserver, QueryOutcome};

/// One conversation with a provider, backed by one tool service connection.
///
/// Tools are discovered once at connect time and advertised on every
/// completion. [`ChatSession::disconnect`] consumes the session, so the
/// connection is released at most once; [`ChatSession::run`] also makes it
/// released at least once.
pub struct ChatSession<P: ProviderAdapter> {
    agent: AgentLoop<P>,
    service: Arc<dyn ToolService>,
}

impl<P: ProviderAdapter> ChatSession<P> {
    /// Connect to an MCP server over SSE and discover its tools.
    pub async fn connect(provider: P, server_url: &str, timeout: Duration) -> Result<Self> {
        let client = McpClient::connect(server_url, timeout).await?;
        Self::with_service(provider, Arc::new(client)).await
    }

    /// Use an already connected tool service.
    ///
    /// The service is closed again if discovery fails.
    pub async fn with_service(provider: P, service: Arc<dyn ToolService>) -> Result<Self> {
        let tools = match service.discover().await {
            Ok(tools) => tools,
            Err(e) => {
                if let Err(close_err) = service.close().await {
                    warn!(error = %close_err, "Failed to close tool service");
                }
                return Err(e);
            }
        };

        info!(
            provider = provider.name(),
            model = provider.model(),
            tools = tools.len(),
            "Chat session ready"
        );

        Ok(Self {
            agent: AgentLoop::new(provider, Arc::clone(&service), tools),
            service,
        })
    }

    /// Set the per-query iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.agent = self.agent.with_max_iterations(max_iterations);
        self
    }

    /// Tools discovered at connect time.
    pub fn tools(&self) -> &[ToolDescriptor] {
        self.agent.tools()
    }

    pub fn transcript(&self) -> &Transcript {
        self.agent.transcript()
    }

    pub fn provider(&self) -> &P {
        self.agent.provider()
    }

    pub async fn process_query(&mut self, query: &str) -> Result<QueryOutcome> {
        self.agent.process_query(query).await
    }

    pub async fn process_query_with(
        &mut self,
        query: &str,
        observer: &dyn QueryObserver,
    ) -> Result<QueryOutcome> {
        self.agent.process_query_with(query, observer).await
    }

    /// Run `body` against the session, then disconnect whatever it returned.
    ///
    /// A failed disconnect is logged and does not replace the body's result.
    /// If the returned future is dropped before completing, the service is
    /// released by its own `Drop`.
    pub async fn run<T, E, F>(mut self, body: F) -> std::result::Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Self) -> BoxFuture<'s, std::result::Result<T, E>>,
    {
        let result = body(&mut self).await;
        if let Err(e) = self.disconnect().await {
            warn!(error = %e, "Failed to disconnect tool service");
        }
        result
    }

    /// Release the tool service connection.
    pub async fn disconnect(self) -> Result<()> {
        info!(turns = self.agent.transcript().len(), "Closing chat session");
        self.service.close().await
    }
}
