//! HTTP layer for Grandma.
//!
//! Axum routes under `/api/`, a JSON envelope for every non-streaming
//! response, and the streaming chat endpoint.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
