//! Business logic and repository trait definitions for Grandma.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the streaming chat pipeline built
//! on top of them. It depends only on `grandma-types` -- never on
//! `grandma-infra` or any database/HTTP crate.

pub mod chat;
pub mod llm;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
