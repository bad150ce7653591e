//! Saved story excerpts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner guid used when the caller does not supply one.
pub const DEFAULT_STORY_GUID: &str = "default";

/// An excerpt of a document saved by the user.
///
/// Within one `guid` the `content_hash` (lowercase hex SHA-256 of
/// `content`) is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    pub document_id: Uuid,
    pub guid: String,
    pub title: String,
    pub content: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for saving a story.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStory {
    #[serde(default)]
    pub guid: Option<String>,
    pub document_id: Uuid,
    pub title: String,
    pub content: String,
    /// Hash computed by the client; verified against the server's.
    #[serde(default)]
    pub content_hash: Option<String>,
}
