use anyhow::Result as AnyhowResult;
use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

use super::auth::AzureAuth;
use super::base::{
    AgentDefinition, AgentPlatform, AgentRequest, Connection, ConversationSession,
    PlatformConnector, PlatformError,
};
use super::configs::ProjectConfig;
use super::types::{
    error_message, ApiConnectionList, ApiList, ApiMessage, ApiResource, ApiRun, RunStatus,
};
use crate::config::Settings;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::toolbox::Toolbox;

pub const CONNECTIONS_API_VERSION: &str = "2024-07-01-preview";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const MESSAGE_PAGE_SIZE: &str = "100";

/// Client for the Azure AI Agent Service of one project
pub struct AzureAgentsClient {
    client: Client,
    config: ProjectConfig,
    auth: AzureAuth,
    poll_interval: Duration,
}

impl AzureAgentsClient {
    pub fn new(config: ProjectConfig, auth: AzureAuth) -> Result<Self, PlatformError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            config,
            auth,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Build a client from settings and confirm a credential can be obtained
    pub async fn connect(settings: &Settings) -> Result<Self, PlatformError> {
        let config = ProjectConfig::from_connection_string(
            &settings.azure_ai_connection_string,
            &settings.azure_ai_agents_api_version,
        )?;
        let client = Self::new(config, AzureAuth::azure_cli())?;
        client.auth.bearer().await?;
        tracing::info!(endpoint = %client.config.endpoint, project = %client.config.project_name, "connected to agent platform");
        Ok(client)
    }

    /// How long to wait between run status checks
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
    ) -> Result<RequestBuilder, PlatformError> {
        let url = format!("{}/{}", self.config.base_url(), path);
        let auth_header = self.auth.bearer().await?;
        Ok(self
            .client
            .request(method, url)
            .query(&[("api-version", api_version)])
            .header("Authorization", auth_header))
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PlatformError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PlatformError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PlatformError> {
        let request = self
            .request(Method::GET, path, &self.config.api_version)
            .await?
            .query(query);
        Self::execute(request).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, payload: Value) -> Result<T, PlatformError> {
        let request = self
            .request(Method::POST, path, &self.config.api_version)
            .await?
            .json(&payload);
        Self::execute(request).await
    }

    async fn delete(&self, path: &str) -> Result<(), PlatformError> {
        let request = self
            .request(Method::DELETE, path, &self.config.api_version)
            .await?;
        Self::execute::<Value>(request).await?;
        Ok(())
    }

    /// Fetch settled messages posted after `cursor`, advancing it, and keep the assistant ones
    async fn new_replies(
        &self,
        session_id: &str,
        cursor: &mut String,
    ) -> Result<Vec<Message>, PlatformError> {
        let path = format!("threads/{}/messages", session_id);
        let mut replies = Vec::new();
        loop {
            let page: ApiList<ApiMessage> = self
                .get(
                    &path,
                    &[("order", "asc"), ("after", cursor.as_str()), ("limit", MESSAGE_PAGE_SIZE)],
                )
                .await?;

            // An empty page cannot advance the cursor
            if page.data.is_empty() {
                return Ok(replies);
            }

            let mut consumed_all = true;
            for message in page.data {
                if !message.is_settled() {
                    consumed_all = false;
                    break;
                }
                *cursor = message.id.clone();
                if message.is_assistant() {
                    replies.push(message.into_message());
                }
            }

            if !(page.has_more && consumed_all) {
                return Ok(replies);
            }
        }
    }

    /// Run every tool call the agent asked for and shape the results for `submit_tool_outputs`
    async fn run_tool_calls(&self, run: &ApiRun, toolbox: &Toolbox) -> Vec<Value> {
        let mut outputs = Vec::new();
        for call in run.tool_calls() {
            let arguments = if call.function.arguments.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                    tracing::warn!(tool = %call.function.name, "unparseable tool arguments: {}", e);
                    json!({})
                })
            };

            tracing::info!(tool = %call.function.name, "agent requested tool call");
            let output = match toolbox
                .dispatch(ToolCall::new(&call.function.name, arguments))
                .await
            {
                Ok(contents) => contents
                    .iter()
                    .map(|c| c.summary())
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(e) => {
                    tracing::warn!(tool = %call.function.name, "tool call failed: {}", e);
                    format!("Error: {}", e)
                }
            };

            outputs.push(json!({ "tool_call_id": call.id, "output": output }));
        }
        outputs
    }
}

fn tools_to_function_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect()
}

#[async_trait]
impl AgentPlatform for AzureAgentsClient {
    async fn list_connections(&self) -> Result<Vec<Connection>, PlatformError> {
        let request = self
            .request(Method::GET, "connections", CONNECTIONS_API_VERSION)
            .await?;
        let connections: ApiConnectionList = Self::execute(request).await?;
        Ok(connections.value.into_iter().map(Connection::from).collect())
    }

    async fn create_agent(&self, request: &AgentRequest) -> Result<AgentDefinition, PlatformError> {
        let payload = json!({
            "model": request.model,
            "name": request.name,
            "description": request.description,
            "instructions": request.instructions,
            "tools": tools_to_function_spec(&request.tools),
        });
        let created: ApiResource = self.post("assistants", payload).await?;
        tracing::info!(agent_id = %created.id, "agent created");

        Ok(AgentDefinition {
            id: created.id,
            model: request.model.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            instructions: request.instructions.clone(),
            tools: request.tools.clone(),
        })
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<(), PlatformError> {
        self.delete(&format!("assistants/{}", agent_id)).await?;
        tracing::info!(agent_id, "agent deleted");
        Ok(())
    }

    async fn create_session(&self) -> Result<ConversationSession, PlatformError> {
        let created: ApiResource = self.post("threads", json!({})).await?;
        tracing::info!(thread_id = %created.id, "thread created");
        Ok(ConversationSession { id: created.id })
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), PlatformError> {
        self.delete(&format!("threads/{}", session_id)).await?;
        tracing::info!(thread_id = session_id, "thread deleted");
        Ok(())
    }

    fn invoke<'a>(
        &'a self,
        agent: &'a AgentDefinition,
        session: &'a ConversationSession,
        message: Message,
        toolbox: &'a Toolbox,
    ) -> BoxStream<'a, Result<Message, PlatformError>> {
        Box::pin(async_stream::try_stream! {
            let posted: ApiMessage = self
                .post(
                    &format!("threads/{}/messages", session.id),
                    json!({ "role": "user", "content": message.text() }),
                )
                .await?;
            let mut cursor = posted.id;

            let mut run: ApiRun = self
                .post(
                    &format!("threads/{}/runs", session.id),
                    json!({ "assistant_id": agent.id }),
                )
                .await?;
            tracing::debug!(run_id = %run.id, "run started");

            loop {
                run.ensure_not_failed()?;
                match run.status {
                    RunStatus::Completed => {
                        for reply in self.new_replies(&session.id, &mut cursor).await? {
                            yield reply;
                        }
                        break;
                    }
                    RunStatus::RequiresAction => {
                        for reply in self.new_replies(&session.id, &mut cursor).await? {
                            yield reply;
                        }
                        let outputs = self.run_tool_calls(&run, toolbox).await;
                        run = self
                            .post(
                                &format!("threads/{}/runs/{}/submit_tool_outputs", session.id, run.id),
                                json!({ "tool_outputs": outputs }),
                            )
                            .await?;
                    }
                    _ => {
                        tokio::time::sleep(self.poll_interval).await;
                        run = self
                            .get(&format!("threads/{}/runs/{}", session.id, run.id), &[])
                            .await?;
                    }
                }
            }
        })
    }
}

/// Connects to the Azure AI Agent Service named by the settings' connection string
#[derive(Debug, Default, Clone)]
pub struct AzureConnector;

#[async_trait]
impl PlatformConnector for AzureConnector {
    async fn connect(&self, settings: &Settings) -> AnyhowResult<Box<dyn AgentPlatform>> {
        let client = AzureAgentsClient::connect(settings).await?;
        Ok(Box::new(client))
    }
}
