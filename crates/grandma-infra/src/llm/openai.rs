//! OpenAI chat completions adapter.
//!
//! Streaming responses are server-sent events: each payload line reads
//! `data: {json}` and the stream closes with `data: [DONE]`. Only
//! `choices[0].delta.content` is of interest.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use grandma_core::llm::provider::{DeltaStream, LlmProvider};
use grandma_types::llm::{LlmError, Message};

use super::stream::{LineOutcome, check_status, line_stream, transport_error};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode one SSE line of a chat completions stream.
pub(crate) fn decode_openai_line(line: &str) -> LineOutcome {
    let Some(data) = line.strip_prefix("data:") else {
        return LineOutcome::Skip;
    };
    let data = data.trim();
    if data.is_empty() {
        return LineOutcome::Skip;
    }
    if data == "[DONE]" {
        return LineOutcome::Done;
    }
    match serde_json::from_str::<ChunkPayload>(data) {
        Ok(payload) => payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
            .map_or(LineOutcome::Skip, LineOutcome::Delta),
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable openai stream line");
            LineOutcome::Skip
        }
    }
}

/// OpenAI-family provider (`openai`, `gpt-3.5-turbo`, `gpt-4`).
///
/// Does not derive `Debug`; the key is a [`SecretString`] and only leaves
/// it as the `Authorization` header.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn request(&self, messages: &[Message], stream: bool) -> reqwest::RequestBuilder {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream,
        };
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(name = "openai.chat", skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let response = self
            .request(messages, false)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("chat completion: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn stream_chat(&self, messages: Vec<Message>, cancel: CancellationToken) -> DeltaStream {
        tracing::debug!(model = %self.model, messages = messages.len(), "opening openai stream");
        line_stream(self.request(&messages, true), cancel, decode_openai_line)
    }
}
