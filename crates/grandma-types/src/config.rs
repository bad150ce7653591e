//! Application configuration types for Grandma.
//!
//! `AppConfig` represents `{data_dir}/config.toml`. Every field has a
//! default, so an empty or missing file yields a working configuration.
//! API keys are never part of this file; they come from the environment
//! and are held as secrets by the infrastructure layer.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// Database location. `None` means `{data_dir}/grandma.db`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<String>,
}

/// Chat pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Buffered assistant output is appended to storage once it reaches
    /// this many bytes.
    #[serde(default = "default_flush_threshold_bytes")]
    pub flush_threshold_bytes: usize,
    /// Number of most recent documents replayed as context.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Model alias used for title generation.
    #[serde(default = "default_title_model")]
    pub title_model: String,
    /// Overall deadline for one provider stream.
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,
    /// Stop reading from the provider once the client has gone away.
    #[serde(default)]
    pub abort_on_client_disconnect: bool,
}

fn default_flush_threshold_bytes() -> usize {
    100
}

fn default_history_limit() -> u32 {
    20
}

fn default_title_model() -> String {
    "openai".to_string()
}

fn default_stream_timeout_secs() -> u64 {
    300
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            flush_threshold_bytes: default_flush_threshold_bytes(),
            history_limit: default_history_limit(),
            title_model: default_title_model(),
            stream_timeout_secs: default_stream_timeout_secs(),
            abort_on_client_disconnect: false,
        }
    }
}

/// OpenAI-family endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Upstream model used for the bare `openai` alias.
    #[serde(default = "default_openai_model")]
    pub model: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

/// Anthropic-family endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    /// Upstream model used for the `anthropic` and `claude` aliases.
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            max_tokens: default_max_tokens(),
        }
    }
}
