//! LLM message types and provider errors.
//!
//! These types model the provider-facing side of a chat exchange: the
//! normalized role/content messages sent upstream, the provider families
//! the selector can resolve to, and the error taxonomy adapters report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Upstream provider family a model alias resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    OpenAi,
    Anthropic,
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFamily::OpenAi => write!(f, "openai"),
            ProviderFamily::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// A model alias accepted by the chat endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModelAlias {
    pub id: &'static str,
    pub family: ProviderFamily,
    /// Whether credentials for the family are configured.
    pub available: bool,
}

/// Errors from LLM provider operations.
///
/// `NotConfigured` and `UnsupportedModel` are configuration errors raised
/// by the selector before any network call. Everything else comes from an
/// adapter talking to the upstream API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    #[error("{provider} API key is not configured")]
    NotConfigured { provider: ProviderFamily },

    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("stream cancelled")]
    Cancelled,

    #[error("provider returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    /// True for errors raised before any request reached the provider.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LlmError::NotConfigured { .. } | LlmError::UnsupportedModel(_)
        )
    }
}
