//! SQLite storage layer.
//!
//! Repository implementations over a shared [`pool::DatabasePool`]. Every
//! repository holds a clone of the pool; reads use `reader`, writes
//! `writer`. Timestamps are stored as fixed-width RFC 3339 strings in UTC
//! so lexical order equals time order.

pub mod conversation;
pub mod document;
pub mod pool;
pub mod story;

use chrono::{DateTime, SecondsFormat, Utc};
use grandma_types::error::RepositoryError;
use uuid::Uuid;

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn parse_uuid(s: &str, what: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what}: {e}")))
}

pub(crate) fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}
