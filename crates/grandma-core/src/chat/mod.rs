//! Streaming chat pipeline.
//!
//! - [`relay`]: the client-facing transport a stream is forwarded to.
//! - [`sink`]: relays each delta and buffers it into the assistant document.
//! - [`service`]: the per-request orchestrator.
//! - [`title`]: conversation title derivation and generation.

pub mod relay;
pub mod service;
pub mod sink;
pub mod title;
