//! LLM provider implementations.
//!
//! Concrete [`LlmProvider`](grandma_core::llm::provider::LlmProvider)
//! adapters for the OpenAI chat completions API and the Anthropic Messages
//! API, and the [`ProviderRegistry`] that picks one from a model alias.

pub mod anthropic;
pub mod openai;
pub mod registry;
mod stream;

pub use registry::{ChatProvider, ProviderCredentials, ProviderRegistry};
