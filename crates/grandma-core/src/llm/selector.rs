//! ProviderSelector trait definition.

use std::sync::Arc;

use grandma_types::llm::LlmError;

use super::provider::LlmProvider;

/// Maps a caller-supplied model alias to a configured provider.
///
/// Selection is synchronous and must fail with
/// [`LlmError::NotConfigured`] or [`LlmError::UnsupportedModel`] before
/// any network call is made.
pub trait ProviderSelector: Send + Sync {
    type Provider: LlmProvider + 'static;

    fn select(&self, model: &str) -> Result<Self::Provider, LlmError>;
}

/// One registry shared by the chat and conversation services.
impl<T: ProviderSelector> ProviderSelector for Arc<T> {
    type Provider = T::Provider;

    fn select(&self, model: &str) -> Result<Self::Provider, LlmError> {
        (**self).select(model)
    }
}
