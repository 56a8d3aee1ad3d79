use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use logo_agent::config::{ConfigError, Settings};
use logo_agent::errors::{AgentError, AgentResult};
use logo_agent::models::content::Content;
use logo_agent::models::message::Message;
use logo_agent::models::tool::{Tool, ToolCall};
use logo_agent::platform::base::{
    AgentDefinition, AgentPlatform, AgentRequest, Connection, ConversationSession, PlatformConnector,
    PlatformError,
};
use logo_agent::providers::base::{ToolLauncher, ToolProvider};
use logo_agent::providers::mcp::McpServerConfig;
use logo_agent::toolbox::Toolbox;

use crate::workflow::Workflow;

/// Everything the workflow asked of the platform and the tool servers, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect,
    ListConnections,
    Launch(String),
    ListTools(String),
    CloseProvider(String),
    CreateAgent(AgentRequest),
    CreateSession,
    Invoke(String),
    DeleteSession(String),
    DeleteAgent(String),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

fn record(log: &EventLog, event: Event) {
    log.lock().unwrap().push(event);
}

/// A platform that answers from fixed data. Replies are `Ok(text)` or `Err(run failure)`.
#[derive(Clone)]
pub struct MockPlatform {
    log: EventLog,
    pub connections: Vec<Connection>,
    pub replies: Vec<Result<String, String>>,
    pub fail_create_session: bool,
    pub fail_delete_session: bool,
}

#[async_trait]
impl AgentPlatform for MockPlatform {
    async fn list_connections(&self) -> Result<Vec<Connection>, PlatformError> {
        record(&self.log, Event::ListConnections);
        Ok(self.connections.clone())
    }

    async fn create_agent(&self, request: &AgentRequest) -> Result<AgentDefinition, PlatformError> {
        record(&self.log, Event::CreateAgent(request.clone()));
        Ok(AgentDefinition {
            id: "asst_1".to_string(),
            model: request.model.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            instructions: request.instructions.clone(),
            tools: request.tools.clone(),
        })
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<(), PlatformError> {
        record(&self.log, Event::DeleteAgent(agent_id.to_string()));
        Ok(())
    }

    async fn create_session(&self) -> Result<ConversationSession, PlatformError> {
        record(&self.log, Event::CreateSession);
        if self.fail_create_session {
            return Err(PlatformError::Api {
                status: 500,
                message: "thread store unavailable".to_string(),
            });
        }
        Ok(ConversationSession {
            id: "thread_1".to_string(),
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), PlatformError> {
        record(&self.log, Event::DeleteSession(session_id.to_string()));
        if self.fail_delete_session {
            return Err(PlatformError::Api {
                status: 404,
                message: "no such thread".to_string(),
            });
        }
        Ok(())
    }

    fn invoke<'a>(
        &'a self,
        _agent: &'a AgentDefinition,
        _session: &'a ConversationSession,
        message: Message,
        _toolbox: &'a Toolbox,
    ) -> BoxStream<'a, Result<Message, PlatformError>> {
        record(&self.log, Event::Invoke(message.text()));
        let replies = self.replies.clone().into_iter().map(|reply| {
            reply
                .map(|text| Message::assistant().with_text(text))
                .map_err(|message| PlatformError::RunFailed {
                    status: "failed".to_string(),
                    message,
                })
        });
        stream::iter(replies).boxed()
    }
}

/// Hands out a [`MockPlatform`], or fails like an unauthenticated client when there is none
pub struct MockConnector {
    log: EventLog,
    pub platform: Option<MockPlatform>,
}

#[async_trait]
impl PlatformConnector for MockConnector {
    async fn connect(&self, _settings: &Settings) -> Result<Box<dyn AgentPlatform>> {
        record(&self.log, Event::Connect);
        match &self.platform {
            Some(platform) => Ok(Box::new(platform.clone())),
            None => Err(anyhow!("az login required")),
        }
    }
}

pub struct MockToolProvider {
    log: EventLog,
    name: String,
    tools: Vec<String>,
}

#[async_trait]
impl ToolProvider for MockToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        record(&self.log, Event::ListTools(self.name.clone()));
        Ok(self
            .tools
            .iter()
            .map(|tool| Tool::new(tool, format!("{} tool", tool), json!({"type": "object"})))
            .collect())
    }

    async fn call_tool(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        if !self.tools.contains(&tool_call.name) {
            return Err(AgentError::ToolNotFound(tool_call.name));
        }
        Ok(vec![Content::text(format!("{} ok", tool_call.name))])
    }

    async fn close(&self) {
        record(&self.log, Event::CloseProvider(self.name.clone()));
    }
}

/// Launches mock providers with the tool names configured per server name
pub struct MockLauncher {
    log: EventLog,
    pub tools: HashMap<String, Vec<String>>,
    pub fail_on: Option<String>,
}

#[async_trait]
impl ToolLauncher for MockLauncher {
    async fn launch(&self, config: &McpServerConfig) -> Result<Arc<dyn ToolProvider>> {
        record(&self.log, Event::Launch(config.name.clone()));
        if self.fail_on.as_deref() == Some(config.name.as_str()) {
            return Err(anyhow!("{}: command not found", config.command));
        }
        Ok(Arc::new(MockToolProvider {
            log: Arc::clone(&self.log),
            name: config.name.clone(),
            tools: self.tools.get(&config.name).cloned().unwrap_or_default(),
        }))
    }
}

/// A connector and launcher sharing one event log, preloaded for a successful run
pub struct Harness {
    log: EventLog,
    pub connector: MockConnector,
    pub launcher: MockLauncher,
}

impl Harness {
    pub fn new() -> Self {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let platform = MockPlatform {
            log: Arc::clone(&log),
            connections: vec![Connection {
                name: "aoai-eastus".to_string(),
                category: "AzureOpenAI".to_string(),
            }],
            replies: vec![
                Ok("Searching the web for the Rust logo".to_string()),
                Ok("<img src=\"rust-logo.png\" alt=\"The Rust logo\">".to_string()),
            ],
            fail_create_session: false,
            fail_delete_session: false,
        };
        let tools = HashMap::from([
            (
                "LogoImageValidationTools".to_string(),
                vec!["validate_logo".to_string()],
            ),
            (
                "WebSearch".to_string(),
                vec![
                    "brave_web_search".to_string(),
                    "brave_local_search".to_string(),
                ],
            ),
        ]);

        Self {
            connector: MockConnector {
                log: Arc::clone(&log),
                platform: Some(platform),
            },
            launcher: MockLauncher {
                log: Arc::clone(&log),
                tools,
                fail_on: None,
            },
            log,
        }
    }

    pub fn platform_mut(&mut self) -> &mut MockPlatform {
        self.connector
            .platform
            .as_mut()
            .expect("platform was removed")
    }

    pub fn vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "AZURE_AI_CONNECTION_STRING".to_string(),
                "eastus.api.azureml.ms;sub-id;my-rg;my-project".to_string(),
            ),
            ("AZURE_AI_CHAT_MODEL_ID".to_string(), "gpt-4o".to_string()),
            ("BRAVE_API_KEY".to_string(), "brave-key".to_string()),
        ])
    }

    pub fn settings() -> Result<Settings, ConfigError> {
        Settings::from_vars(Self::vars())
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    /// Run the workflow, returning its result and everything it printed
    pub async fn run(
        &self,
        settings: Result<Settings, ConfigError>,
        brand: &str,
    ) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = Workflow::new(&self.connector, &self.launcher)
            .run(settings, brand, &mut out)
            .await;
        (result, String::from_utf8(out).unwrap())
    }
}
