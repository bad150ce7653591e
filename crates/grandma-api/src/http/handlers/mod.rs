//! HTTP request handlers, one module per resource.

pub mod chat;
pub mod conversation;
pub mod document;
pub mod models;
pub mod story;
