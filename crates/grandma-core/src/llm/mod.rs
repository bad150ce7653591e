//! LLM provider abstractions.
//!
//! [`provider::LlmProvider`] is implemented once per upstream family in
//! `grandma-infra`; [`selector::ProviderSelector`] maps a model alias to one
//! of them.

pub mod provider;
pub mod selector;
