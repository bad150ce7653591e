//! Shared domain types for Grandma.
//!
//! This crate contains the domain types used across the workspace:
//! conversations, documents, stories, chat messages, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod story;
