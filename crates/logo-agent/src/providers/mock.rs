use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use super::base::ToolProvider;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// A mock provider with fixed tools that echoes every call back as text
pub struct MockToolProvider {
    name: String,
    tools: Vec<Tool>,
    calls: Mutex<Vec<ToolCall>>,
}

impl MockToolProvider {
    pub fn new(name: &str, tool_names: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tools: tool_names
                .iter()
                .map(|tool| Tool::new(*tool, format!("{} tool", tool), serde_json::json!({"type": "object"})))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolProvider for MockToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        self.calls.lock().unwrap().push(tool_call.clone());
        if !self.tools.iter().any(|t| t.name == tool_call.name) {
            return Err(AgentError::ToolNotFound(tool_call.name));
        }
        Ok(vec![Content::text(format!(
            "{} called with {}",
            tool_call.name, tool_call.arguments
        ))])
    }

    async fn close(&self) {}
}
