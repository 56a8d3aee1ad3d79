use anyhow::Result as AnyhowResult;
use async_trait::async_trait;
use mcp_sdk_rs::client::Client;
use mcp_sdk_rs::session::Session;
use mcp_sdk_rs::transport::Message;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{mpsc, Mutex, RwLock};

use super::base::{ToolLauncher, ToolProvider};
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// How to launch one tool server as a child process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn server: {0}")]
    SpawnFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Disconnected")]
    Disconnected,
}

/// A tool server reached over stdio.
///
/// Dropping the client and its session sender ends the session loop, and the session spawns
/// the child with `kill_on_drop` so it never outlives the connection.
pub struct McpClient {
    name: String,
    client: RwLock<Option<Client>>,
    to_session_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

impl McpClient {
    pub async fn spawn(config: &McpServerConfig) -> Result<Self, McpError> {
        // The session pipes all three stdio streams itself; server stderr is drained and dropped
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if let Some(env) = &config.env {
            cmd.envs(env);
        }

        let (to_session_tx, to_session_rx) = mpsc::unbounded_channel::<Message>();
        let (from_session_tx, from_session_rx) = mpsc::unbounded_channel::<Message>();

        let session = Session::Local {
            handler: None,
            command: cmd,
            receiver: Arc::new(Mutex::new(to_session_rx)),
            sender: Arc::new(from_session_tx),
        };

        // Session::start panics when the process cannot be spawned, so it runs on its own task
        match tokio::spawn(session.start()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(McpError::SpawnFailed(format!("{}: {}", config.command, e)));
            }
            Err(e) => {
                let reason = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    "startup cancelled".to_string()
                };
                return Err(McpError::SpawnFailed(format!("{}: {}", config.command, reason)));
            }
        }

        let client = Client::new(to_session_tx.clone(), from_session_rx);

        client
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        client
            .notify("notifications/initialized", None)
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        tracing::debug!(server = %config.name, "mcp session initialized");

        Ok(Self {
            name: config.name.clone(),
            client: RwLock::new(Some(client)),
            to_session_tx: Mutex::new(Some(to_session_tx)),
        })
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(McpError::Disconnected)?;
        client
            .request(method, params)
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl ToolProvider for McpClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> AnyhowResult<Vec<Tool>> {
        let response = self.request("tools/list", None).await?;
        let tools: Vec<Tool> = serde_json::from_value(response["tools"].clone())
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(tools)
    }

    async fn call_tool(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        let response = self
            .request(
                "tools/call",
                Some(json!({
                    "name": tool_call.name,
                    "arguments": tool_call.arguments
                })),
            )
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        parse_call_result(&response)
    }

    async fn close(&self) {
        self.client.write().await.take();
        self.to_session_tx.lock().await.take();
        tracing::debug!(server = %self.name, "mcp session closed");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast::<&str>()
            .map(|message| message.to_string())
            .unwrap_or_else(|_| "process failed to start".to_string()),
    }
}

/// Convert a `tools/call` result into contents, turning `isError` results into errors
fn parse_call_result(response: &Value) -> AgentResult<Vec<Content>> {
    // Content types we don't model (embedded resources) are skipped
    let contents: Vec<Content> = response["content"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let is_error = response
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if is_error {
        let text = contents
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(AgentError::ExecutionError(text));
    }

    Ok(contents)
}

/// Launches tool servers as stdio child processes
#[derive(Debug, Default, Clone)]
pub struct McpLauncher;

#[async_trait]
impl ToolLauncher for McpLauncher {
    async fn launch(&self, config: &McpServerConfig) -> AnyhowResult<Arc<dyn ToolProvider>> {
        let client = McpClient::spawn(config).await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_result() {
        let response = json!({
            "content": [
                {"type": "text", "text": "image/png, 512x512"},
                {"type": "resource", "resource": {"uri": "file:///tmp/x"}}
            ]
        });

        let contents = parse_call_result(&response).unwrap();
        assert_eq!(contents, vec![Content::text("image/png, 512x512")]);
    }

    #[test]
    fn test_parse_call_result_error() {
        let response = json!({
            "content": [{"type": "text", "text": "404 Not Found"}],
            "isError": true
        });

        assert_eq!(
            parse_call_result(&response),
            Err(AgentError::ExecutionError("404 Not Found".to_string()))
        );
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(
            panic_message(Box::new("a spawned subprocess: NotFound".to_string())),
            "a spawned subprocess: NotFound"
        );
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(42)), "process failed to start");
    }

    #[tokio::test]
    async fn test_spawn_missing_command_is_an_error() {
        let config = McpServerConfig {
            name: "Missing".to_string(),
            command: "logo-agent-no-such-command".to_string(),
            args: vec![],
            env: None,
        };

        match McpClient::spawn(&config).await {
            Err(McpError::SpawnFailed(message)) => {
                assert!(message.starts_with("logo-agent-no-such-command: "))
            }
            Err(other) => panic!("Expected SpawnFailed, got {:?}", other),
            Ok(_) => panic!("Expected SpawnFailed, got a client"),
        }
    }
}
