//! Request extractors for the HTTP API.

pub mod query;
