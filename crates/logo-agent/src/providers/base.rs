use anyhow::Result as AnyhowResult;
use async_trait::async_trait;
use std::sync::Arc;

use super::mcp::McpServerConfig;
use crate::errors::AgentResult;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// An external process exposing a discoverable set of tools the agent may invoke
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Get the name of the provider, used to qualify its tool names
    fn name(&self) -> &str;

    /// Ask the provider for its available tools, in the order it reports them
    async fn list_tools(&self) -> AnyhowResult<Vec<Tool>>;

    /// Call one of the provider's tools by its unqualified name
    async fn call_tool(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>>;

    /// Release the connection. Calls made after closing fail.
    async fn close(&self);
}

/// Opens a connected [`ToolProvider`] from a launch configuration
#[async_trait]
pub trait ToolLauncher: Send + Sync {
    async fn launch(&self, config: &McpServerConfig) -> AnyhowResult<Arc<dyn ToolProvider>>;
}
