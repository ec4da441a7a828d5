//! The tool service seen from the chat loop.
//!
//! A [`ToolService`] publishes tool descriptors and invokes tools by name. The
//! MCP client implements it over the network; [`ToolRegistry`] implements it
//! in-process.

use async_trait::async_trait;

use crate::error::Result;
use crate::providers::ToolDescriptor;
use crate::session::ToolArguments;

use super::{ToolOutput, ToolRegistry};

/// Discovery and invocation of tools.
///
/// `invoke` returns `Ok` with `is_error = true` for failures the tool itself
/// reported. `Err` is reserved for failures reaching or running the service.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// List the tools the service publishes.
    async fn discover(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool.
    async fn invoke(&self, name: &str, arguments: ToolArguments) -> Result<ToolOutput>;

    /// Release the connection, if any. The default does nothing.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ToolService for ToolRegistry {
    async fn discover(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.descriptors())
    }

    async fn invoke(&self, name: &str, arguments: ToolArguments) -> Result<ToolOutput> {
        self.execute(name, arguments).await
    }
}
