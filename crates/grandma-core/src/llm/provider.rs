//! LlmProvider trait definition.
//!
//! This is the core abstraction that every provider adapter implements.
//! Uses RPITIT for `chat`, and `Pin<Box<dyn Stream>>` for `stream_chat`
//! so the returned stream is `'static` and can outlive the borrow of the
//! provider.

use std::pin::Pin;

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use grandma_types::llm::{LlmError, Message};

/// A lazy, finite, non-restartable sequence of text deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// Trait for LLM provider backends (OpenAI-family, Anthropic-family).
///
/// Implementations live in grandma-infra. Adapters never touch storage.
pub trait LlmProvider: Send + Sync {
    /// Provider family name (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Upstream model identifier sent on the wire.
    fn model(&self) -> &str;

    /// Send the messages and return the full generated text.
    fn chat(
        &self,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;

    /// Send the messages and stream back text deltas.
    ///
    /// Non-2xx responses and transport failures end the stream with an
    /// error item. Frames that fail to decode are skipped. Once `cancel`
    /// fires the stream yields [`LlmError::Cancelled`] at the next read.
    fn stream_chat(&self, messages: Vec<Message>, cancel: CancellationToken) -> DeltaStream;
}
