use std::sync::Arc;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::ToolProvider;

const SEPARATOR: &str = "__";

/// Longest function name the platform accepts
pub const MAX_TOOL_NAME_LEN: usize = 64;

struct ToolEntry {
    /// The tool as the agent sees it, with a provider-qualified name
    tool: Tool,
    /// The name the provider knows the tool by
    provider_tool_name: String,
    provider: Arc<dyn ToolProvider>,
}

/// Every tool the agent may invoke, qualified by the provider that owns it
#[derive(Default)]
pub struct Toolbox {
    entries: Vec<ToolEntry>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider's tools as `<provider>__<tool>`.
    ///
    /// Fails without registering anything if any qualified name is already taken or is longer
    /// than [`MAX_TOOL_NAME_LEN`].
    pub fn register(&mut self, provider: Arc<dyn ToolProvider>, tools: Vec<Tool>) -> AgentResult<usize> {
        let mut staged: Vec<ToolEntry> = Vec::with_capacity(tools.len());
        for tool in tools {
            let qualified = qualified_name(provider.name(), &tool.name);
            if qualified.len() > MAX_TOOL_NAME_LEN {
                return Err(AgentError::ToolNameTooLong {
                    name: qualified,
                    max: MAX_TOOL_NAME_LEN,
                });
            }
            let taken = self
                .entries
                .iter()
                .chain(staged.iter())
                .any(|entry| entry.tool.name == qualified);
            if taken {
                return Err(AgentError::DuplicateTool(qualified));
            }
            staged.push(ToolEntry {
                tool: Tool::new(qualified, &tool.description, tool.input_schema.clone()),
                provider_tool_name: tool.name,
                provider: Arc::clone(&provider),
            });
        }

        let count = staged.len();
        self.entries.extend(staged);
        Ok(count)
    }

    /// All registered tools with their qualified names, in registration order
    pub fn tools(&self) -> Vec<Tool> {
        self.entries.iter().map(|entry| entry.tool.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dispatch a call made with a qualified name to the provider that owns the tool
    pub async fn dispatch(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.tool.name == tool_call.name)
            .ok_or_else(|| AgentError::ToolNotFound(tool_call.name.clone()))?;

        tracing::debug!(
            provider = entry.provider.name(),
            tool = %entry.provider_tool_name,
            "dispatching tool call"
        );
        entry
            .provider
            .call_tool(ToolCall::new(&entry.provider_tool_name, tool_call.arguments))
            .await
    }
}

/// Function names on the platform may only contain letters, digits, `_` and `-`
fn qualified_name(provider: &str, tool: &str) -> String {
    format!("{}{}{}", provider, SEPARATOR, tool)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
