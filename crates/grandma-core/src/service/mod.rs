//! Use-case services over the repository ports.
//!
//! Services apply request-level rules (paging bounds, title cleanup, hash
//! verification) and depend on traits only, never on grandma-infra.

pub mod conversation;
pub mod document;
pub mod hash;
pub mod story;
