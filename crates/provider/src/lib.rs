//! Chat-completion providers
//!
//! Every provider speaks its own wire format. The adapters in this crate
//! translate the unified [`Message`] / [`ToolDescriptor`] model into that
//! format and normalize the reply into a [`CompletionResult`]; nothing outside
//! this crate needs to know which provider is on the other end.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use thiserror::Error;
use tracing::{debug, trace};

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiCompatibleClient;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the model.
///
/// `raw_arguments` is kept exactly as the provider sent it; decoding it is
/// the invoker's job, so a malformed payload never fails the completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub tool_name: String,
    pub raw_arguments: String,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        raw_arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            raw_arguments: raw_arguments.into(),
        }
    }
}

/// One entry of the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name on tool-role messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
            ..Self::plain(Role::Tool, result)
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A function declaration offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// OpenAI-style `{"type": "function", "function": {...}}` declaration,
    /// which both supported providers accept
    pub fn to_function_declaration(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": &self.name,
                "description": &self.description,
                "parameters": &self.parameters
            }
        })
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
}

/// Token accounting, when the provider reports it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Normalized reply from any provider
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub finish_reason: FinishReason,
    pub message: Message,
    pub usage: Usage,
}

impl CompletionResult {
    /// A final text answer
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            finish_reason: FinishReason::Stop,
            message: Message::assistant(content),
            usage: Usage::default(),
        }
    }

    /// A request to run tools
    pub fn tool_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            finish_reason: FinishReason::ToolCalls,
            message: Message::assistant_with_tool_calls(content, calls),
            usage: Usage::default(),
        }
    }
}

/// A chat-completion backend
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Ask the model for the next turn given the full history and the tools
    /// it may call. Failures are returned as-is; there is no retry.
    async fn complete(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<CompletionResult>;

    /// Display name, for logs
    fn name(&self) -> &str;

    /// Model identifier sent with each request
    fn model(&self) -> &str;
}

/// POST a JSON body and return the decoded JSON reply, mapping HTTP
/// failures onto [`ProviderError`]
pub(crate) async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value> {
    trace!("Sending completion request");

    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message: api_error_message(&text),
        });
    }

    let json: Value = serde_json::from_str(&text)?;
    debug!("Completion response received ({} bytes)", text.len());
    Ok(json)
}

/// Pull the human-readable message out of an error body. Providers use
/// either `{"error": {"message": ...}}` or `{"error": "..."}`.
fn api_error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|json| {
            json["error"]["message"]
                .as_str()
                .or_else(|| json["error"].as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "unknown error".to_string()
            } else {
                body.trim().to_string()
            }
        })
}
