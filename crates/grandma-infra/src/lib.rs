//! Infrastructure layer for Grandma.
//!
//! Implements the repository traits defined in `grandma-core` on SQLite,
//! the OpenAI and Anthropic streaming adapters, SHA-256 content hashing,
//! and configuration loading from `config.toml` plus the environment.

pub mod config;
pub mod crypto;
pub mod llm;
pub mod sqlite;
