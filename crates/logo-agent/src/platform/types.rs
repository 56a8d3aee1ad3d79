//! Wire formats of the agents api
use serde::Deserialize;

use super::base::{Connection, PlatformError};
use crate::models::message::Message;

#[derive(Debug, Deserialize)]
pub struct ApiResource {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<ApiMessageContent>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ApiMessage {
    /// Messages still being written must not be consumed yet
    pub fn is_settled(&self) -> bool {
        self.status.as_deref().map_or(true, |status| status != "in_progress")
    }

    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }

    pub fn into_message(self) -> Message {
        self.content
            .into_iter()
            .fold(Message::assistant(), |message, content| match content {
                ApiMessageContent::Text { text } => message.with_text(text.value),
                ApiMessageContent::Other => message,
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiMessageContent {
    Text { text: ApiText },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct ApiText {
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct ApiRun {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<ApiRunError>,
}

impl ApiRun {
    /// Fail on any terminal status other than completed
    pub fn ensure_not_failed(&self) -> Result<(), PlatformError> {
        let status = match self.status {
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            _ => return Ok(()),
        };
        let message = self
            .last_error
            .as_ref()
            .map(|e| match &e.code {
                Some(code) => format!("{}: {}", code, e.message),
                None => e.message.clone(),
            })
            .unwrap_or_else(|| "no error details".to_string());
        Err(PlatformError::RunFailed {
            status: status.to_string(),
            message,
        })
    }

    pub fn tool_calls(&self) -> &[ApiToolCall] {
        self.required_action
            .as_ref()
            .map(|action| action.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct ApiToolCall {
    pub id: String,
    pub function: ApiFunctionCall,
}

#[derive(Debug, Deserialize)]
pub struct ApiFunctionCall {
    pub name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiRunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiConnectionList {
    #[serde(default)]
    pub value: Vec<ApiConnection>,
}

#[derive(Debug, Deserialize)]
pub struct ApiConnection {
    pub name: String,
    pub properties: ApiConnectionProperties,
}

#[derive(Debug, Deserialize)]
pub struct ApiConnectionProperties {
    #[serde(default)]
    pub category: String,
}

impl From<ApiConnection> for Connection {
    fn from(connection: ApiConnection) -> Self {
        Connection {
            name: connection.name,
            category: connection.properties.category,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Pull the human-readable message out of an error response, falling back to the raw body
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string())
}
