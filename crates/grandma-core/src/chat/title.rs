//! Conversation title derivation and LLM-based generation.

use grandma_types::chat::{DEFAULT_CONVERSATION_TITLE, MAX_TITLE_CHARS};
use grandma_types::llm::{LlmError, Message, MessageRole};

use crate::llm::provider::LlmProvider;

const TITLE_PROMPT: &str = "Generate a concise title for a conversation that starts with the \
user input below. Use at most 20 words, no punctuation, and reply with the title only.";

/// Clean a raw title: newlines become spaces, surrounding whitespace is
/// dropped, and the result is cut to [`MAX_TITLE_CHARS`] characters. An
/// empty result becomes [`DEFAULT_CONVERSATION_TITLE`].
pub fn sanitize_title(raw: &str) -> String {
    let flattened = raw.replace(['\r', '\n'], " ");
    let cut: String = flattened.trim().chars().take(MAX_TITLE_CHARS).collect();
    let cut = cut.trim_end();
    if cut.is_empty() {
        DEFAULT_CONVERSATION_TITLE.to_string()
    } else {
        cut.to_string()
    }
}

/// Title for a new conversation, taken from its first user message.
pub fn title_from_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.role == MessageRole::User)
        .map(|m| sanitize_title(&m.content))
        .unwrap_or_else(|| DEFAULT_CONVERSATION_TITLE.to_string())
}

/// The single-message prompt sent for title generation.
pub fn build_title_prompt(user_inputs: &[String]) -> Vec<Message> {
    vec![Message::user(format!(
        "{TITLE_PROMPT}\n\n{}",
        user_inputs.join("\n")
    ))]
}

/// Ask the provider for a title summarizing `user_inputs`.
///
/// Empty input returns the default title without calling the provider.
#[tracing::instrument(name = "generate_title", skip(provider, user_inputs), fields(provider = provider.name(), inputs = user_inputs.len()))]
pub async fn generate_title<P: LlmProvider>(
    provider: &P,
    user_inputs: &[String],
) -> Result<String, LlmError> {
    if user_inputs.iter().all(|input| input.trim().is_empty()) {
        return Ok(DEFAULT_CONVERSATION_TITLE.to_string());
    }

    let raw = provider.chat(&build_title_prompt(user_inputs)).await?;
    Ok(sanitize_title(&raw))
}
