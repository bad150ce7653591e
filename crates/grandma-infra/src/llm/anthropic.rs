//! Anthropic Messages API adapter.
//!
//! The stream is a sequence of JSON events, normally SSE-framed
//! (`event:` + `data:` line pairs). Decoding is line based and tolerant of
//! bare newline-delimited JSON as well:
//!
//! - `content_block_delta` with a `text` delta emits text
//! - `message_stop` ends the stream
//! - `error` ends the stream with [`LlmError::Stream`]
//! - everything else (`message_start`, `ping`, block start/stop, usage) is skipped

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use grandma_core::llm::provider::{DeltaStream, LlmProvider};
use grandma_types::llm::{LlmError, Message, MessageRole};

use super::stream::{LineOutcome, check_status, line_stream, transport_error};

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: BlockDelta },
    MessageStop,
    Error { error: ErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct BlockDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Decode one line of a Messages API stream.
pub(crate) fn decode_anthropic_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') || line.starts_with("event:") {
        return LineOutcome::Skip;
    }
    let data = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(StreamEvent::ContentBlockDelta { delta }) => delta
            .text
            .filter(|text| !text.is_empty())
            .map_or(LineOutcome::Skip, LineOutcome::Delta),
        Ok(StreamEvent::MessageStop) => LineOutcome::Done,
        Ok(StreamEvent::Error { error }) => {
            LineOutcome::Fail(LlmError::Stream(format!("{}: {}", error.kind, error.message)))
        }
        Ok(StreamEvent::Other) => LineOutcome::Skip,
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable anthropic stream line");
            LineOutcome::Skip
        }
    }
}

/// Anthropic-family provider (`anthropic`, `claude`).
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens,
        }
    }

    fn body<'a>(&'a self, messages: &'a [Message], stream: bool) -> MessagesRequest<'a> {
        // The Messages API takes system prompts out of band.
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream,
        }
    }

    fn request(&self, messages: &[Message], stream: bool) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&self.body(messages, stream))
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(name = "anthropic.chat", skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let response = self
            .request(messages, false)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("messages response: {e}")))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    fn stream_chat(&self, messages: Vec<Message>, cancel: CancellationToken) -> DeltaStream {
        tracing::debug!(model = %self.model, messages = messages.len(), "opening anthropic stream");
        line_stream(self.request(&messages, true), cancel, decode_anthropic_line)
    }
}
