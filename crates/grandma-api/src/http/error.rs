//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use grandma_types::error::{ChatError, RepositoryError, StoryError};
use grandma_types::llm::LlmError;

use super::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    Chat(ChatError),
    Repository(RepositoryError),
    Story(StoryError),
    Validation(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl From<StoryError> for AppError {
    fn from(e: StoryError) -> Self {
        AppError::Story(e)
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Chat(ChatError::Provider(e))
    }
}

fn repository_status(e: &RepositoryError) -> (StatusCode, &'static str) {
    match e {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        RepositoryError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        RepositoryError::Connection | RepositoryError::Query(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        }
    }
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Chat(ChatError::Validation(_)) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Chat(ChatError::ConversationNotFound(_)) => {
                (StatusCode::NOT_FOUND, "CONVERSATION_NOT_FOUND")
            }
            AppError::Chat(ChatError::Provider(LlmError::NotConfigured { .. })) => {
                (StatusCode::BAD_REQUEST, "PROVIDER_NOT_CONFIGURED")
            }
            AppError::Chat(ChatError::Provider(LlmError::UnsupportedModel(_))) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_MODEL")
            }
            AppError::Chat(ChatError::Provider(_)) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            AppError::Chat(ChatError::Storage(e)) | AppError::Repository(e) => repository_status(e),
            AppError::Story(StoryError::NotFound) => (StatusCode::NOT_FOUND, "STORY_NOT_FOUND"),
            AppError::Story(StoryError::Duplicate) => (StatusCode::CONFLICT, "DUPLICATE_STORY"),
            AppError::Story(StoryError::HashMismatch { .. }) => {
                (StatusCode::BAD_REQUEST, "HASH_MISMATCH")
            }
            AppError::Story(StoryError::Invalid(_)) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Story(StoryError::Storage(e)) => repository_status(e),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Chat(e) => e.to_string(),
            AppError::Repository(e) => e.to_string(),
            AppError::Story(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        } else {
            tracing::debug!(code, %message, "request rejected");
        }
        (status, Json(ApiResponse::error(code, message))).into_response()
    }
}
