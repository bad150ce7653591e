//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (grandma-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod conversation;
pub mod document;
pub mod story;
