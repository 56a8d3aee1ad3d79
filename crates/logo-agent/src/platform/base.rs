use anyhow::Result as AnyhowResult;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::toolbox::Toolbox;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Credential unavailable: {0}")]
    Credential(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed: {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Run {status}: {message}")]
    RunFailed { status: String, message: String },
}

/// A backing-model connection configured in the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub name: String,
    pub category: String,
}

/// Everything needed to create an agent on the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub model: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub tools: Vec<Tool>,
}

/// An agent resource that exists on the platform until deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    pub model: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub tools: Vec<Tool>,
}

/// A conversation thread on the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
}

/// The remote agent-hosting service
#[async_trait]
pub trait AgentPlatform: Send + Sync {
    /// List the backing-model connections available to agents
    async fn list_connections(&self) -> Result<Vec<Connection>, PlatformError>;

    async fn create_agent(&self, request: &AgentRequest) -> Result<AgentDefinition, PlatformError>;

    async fn delete_agent(&self, agent_id: &str) -> Result<(), PlatformError>;

    async fn create_session(&self) -> Result<ConversationSession, PlatformError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), PlatformError>;

    /// Send one message to the agent and stream back its replies in arrival order.
    ///
    /// Tool calls the agent requests along the way are dispatched through `toolbox`.
    /// The stream ends when the platform reports the run complete.
    fn invoke<'a>(
        &'a self,
        agent: &'a AgentDefinition,
        session: &'a ConversationSession,
        message: Message,
        toolbox: &'a Toolbox,
    ) -> BoxStream<'a, Result<Message, PlatformError>>;
}

/// Opens an authenticated [`AgentPlatform`] from settings
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn connect(&self, settings: &Settings) -> AnyhowResult<Box<dyn AgentPlatform>>;
}
