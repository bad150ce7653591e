use thiserror::Error;
use uuid::Uuid;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in grandma-core).
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the chat orchestrator and conversation services.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Errors related to story operations.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("story not found")]
    NotFound,

    #[error("a story with the same content already exists")]
    Duplicate,

    #[error("content hash mismatch: computed '{expected}', client sent '{actual}'")]
    HashMismatch { expected: String, actual: String },

    #[error("invalid story: {0}")]
    Invalid(String),

    #[error("storage error: {0}")]
    Storage(RepositoryError),
}

impl From<RepositoryError> for StoryError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => StoryError::NotFound,
            RepositoryError::Conflict(_) => StoryError::Duplicate,
            other => StoryError::Storage(other),
        }
    }
}
