//! Model alias resolution and provider construction.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use grandma_core::llm::provider::{DeltaStream, LlmProvider};
use grandma_core::llm::selector::ProviderSelector;
use grandma_types::config::{AnthropicConfig, OpenAiConfig};
use grandma_types::llm::{LlmError, Message, ModelAlias, ProviderFamily};

use super::anthropic::AnthropicProvider;
use super::openai::OpenAiProvider;

/// Aliases accepted by the chat endpoint, with a fixed upstream model where
/// the alias names one. `None` means the family's configured model.
const ALIASES: &[(&str, ProviderFamily, Option<&str>)] = &[
    ("openai", ProviderFamily::OpenAi, None),
    ("gpt-3.5-turbo", ProviderFamily::OpenAi, Some("gpt-3.5-turbo")),
    ("gpt-4", ProviderFamily::OpenAi, Some("gpt-4")),
    ("anthropic", ProviderFamily::Anthropic, None),
    ("claude", ProviderFamily::Anthropic, None),
];

/// Map an alias to its family and fixed upstream model, if any.
///
/// Case-insensitive, ignores surrounding whitespace.
pub fn resolve_alias(model: &str) -> Option<(ProviderFamily, Option<&'static str>)> {
    let wanted = model.trim();
    ALIASES
        .iter()
        .find(|(alias, _, _)| alias.eq_ignore_ascii_case(wanted))
        .map(|(_, family, upstream)| (*family, *upstream))
}

/// API keys, read from the environment only.
#[derive(Default)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<SecretString>,
    pub anthropic_api_key: Option<SecretString>,
}

impl ProviderCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
        };
        Self {
            openai_api_key: secret("OPENAI_API_KEY"),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
        }
    }

    /// A fresh copy of the family's key, if one is set.
    fn key_for(&self, family: ProviderFamily) -> Option<SecretString> {
        match family {
            ProviderFamily::OpenAi => self.openai_api_key.as_ref(),
            ProviderFamily::Anthropic => self.anthropic_api_key.as_ref(),
        }
        .map(|key| key.expose_secret())
        .filter(|key| !key.is_empty())
        .map(|key| SecretString::from(key.to_owned()))
    }
}

/// The closed set of upstream adapters.
pub enum ChatProvider {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
}

impl LlmProvider for ChatProvider {
    fn name(&self) -> &str {
        match self {
            ChatProvider::OpenAi(p) => p.name(),
            ChatProvider::Anthropic(p) => p.name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            ChatProvider::OpenAi(p) => p.model(),
            ChatProvider::Anthropic(p) => p.model(),
        }
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        match self {
            ChatProvider::OpenAi(p) => p.chat(messages).await,
            ChatProvider::Anthropic(p) => p.chat(messages).await,
        }
    }

    fn stream_chat(&self, messages: Vec<Message>, cancel: CancellationToken) -> DeltaStream {
        match self {
            ChatProvider::OpenAi(p) => p.stream_chat(messages, cancel),
            ChatProvider::Anthropic(p) => p.stream_chat(messages, cancel),
        }
    }
}

/// Builds providers for model aliases from endpoint settings and keys.
///
/// Holds one shared HTTP client; every selected provider clones it.
pub struct ProviderRegistry {
    client: reqwest::Client,
    credentials: ProviderCredentials,
    openai: OpenAiConfig,
    anthropic: AnthropicConfig,
}

impl ProviderRegistry {
    pub fn new(
        credentials: ProviderCredentials,
        openai: OpenAiConfig,
        anthropic: AnthropicConfig,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            credentials,
            openai,
            anthropic,
        })
    }

    /// Every accepted alias and whether its family has a key.
    pub fn aliases(&self) -> Vec<ModelAlias> {
        ALIASES
            .iter()
            .map(|(id, family, _)| ModelAlias {
                id: *id,
                family: *family,
                available: self.credentials.key_for(*family).is_some(),
            })
            .collect()
    }
}

impl ProviderSelector for ProviderRegistry {
    type Provider = ChatProvider;

    fn select(&self, model: &str) -> Result<ChatProvider, LlmError> {
        let (family, upstream) =
            resolve_alias(model).ok_or_else(|| LlmError::UnsupportedModel(model.trim().to_string()))?;
        let key = self
            .credentials
            .key_for(family)
            .ok_or(LlmError::NotConfigured { provider: family })?;

        Ok(match family {
            ProviderFamily::OpenAi => ChatProvider::OpenAi(OpenAiProvider::new(
                self.client.clone(),
                key,
                self.openai.base_url.clone(),
                upstream.unwrap_or(self.openai.model.as_str()),
            )),
            ProviderFamily::Anthropic => ChatProvider::Anthropic(AnthropicProvider::new(
                self.client.clone(),
                key,
                self.anthropic.base_url.clone(),
                upstream.unwrap_or(self.anthropic.model.as_str()),
                self.anthropic.max_tokens,
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(openai: Option<&str>, anthropic: Option<&str>) -> ProviderRegistry {
        let credentials = ProviderCredentials::from_lookup(|key| match key {
            "OPENAI_API_KEY" => openai.map(str::to_string),
            "ANTHROPIC_API_KEY" => anthropic.map(str::to_string),
            _ => None,
        });
        ProviderRegistry::new(credentials, OpenAiConfig::default(), AnthropicConfig::default())
            .unwrap()
    }

    #[test]
    fn test_resolve_alias_is_case_insensitive() {
        assert_eq!(resolve_alias("  OpenAI "), Some((ProviderFamily::OpenAi, None)));
        assert_eq!(
            resolve_alias("GPT-4"),
            Some((ProviderFamily::OpenAi, Some("gpt-4")))
        );
        assert_eq!(resolve_alias("Claude"), Some((ProviderFamily::Anthropic, None)));
        assert_eq!(resolve_alias("llama"), None);
        assert_eq!(resolve_alias(""), None);
    }

    #[test]
    fn test_select_maps_upstream_models() {
        let registry = registry(Some("sk-o"), Some("sk-a"));

        let provider = registry.select("openai").unwrap();
        assert!(matches!(provider, ChatProvider::OpenAi(_)));
        assert_eq!(provider.model(), "gpt-4o-mini");

        assert_eq!(registry.select("gpt-3.5-turbo").unwrap().model(), "gpt-3.5-turbo");

        let provider = registry.select("claude").unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let registry = registry(Some("sk-o"), Some("   "));
        let err = registry.select("anthropic").err().unwrap();
        assert_eq!(
            err,
            LlmError::NotConfigured {
                provider: ProviderFamily::Anthropic
            }
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_alias_is_unsupported() {
        let registry = registry(Some("sk-o"), Some("sk-a"));
        assert_eq!(
            registry.select("mistral").err(),
            Some(LlmError::UnsupportedModel("mistral".into()))
        );
    }

    #[test]
    fn test_aliases_report_availability() {
        let registry = registry(Some("sk-o"), None);
        let aliases = registry.aliases();
        assert_eq!(aliases.len(), 5);
        assert!(aliases.iter().filter(|a| a.family == ProviderFamily::OpenAi).all(|a| a.available));
        assert!(aliases.iter().filter(|a| a.family == ProviderFamily::Anthropic).all(|a| !a.available));
    }
}
