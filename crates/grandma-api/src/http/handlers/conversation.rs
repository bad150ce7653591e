//! Conversation CRUD and title generation handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use grandma_types::chat::{Conversation, ConversationDetail, ConversationPage};

use crate::http::error::AppError;
use crate::http::extractors::query::ConversationListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct CreateConversationBody {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserInputsBody {
    #[serde(default)]
    pub user_inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTitleBody {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConversationBody {
    pub title: String,
    #[serde(default)]
    pub last_document_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedTitle {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedConversation {
    pub id: Uuid,
    pub documents_deleted: u64,
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationListQuery>,
) -> Result<Json<ApiResponse<ConversationPage>>, AppError> {
    let start = Instant::now();
    let page = state
        .conversation_service
        .list(query.page, query.page_size)
        .await?;
    Ok(Json(ApiResponse::success(page, start)))
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    body: Option<Json<CreateConversationBody>>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let conversation = state
        .conversation_service
        .create(body.title.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(conversation, start)))
}

/// POST /api/conversations/new
pub async fn create_default_conversation(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let conversation = state.conversation_service.create(None).await?;
    Ok(Json(ApiResponse::success(conversation, start)))
}

/// POST /api/conversations/new-with-title
pub async fn create_conversation_with_title(
    State(state): State<AppState>,
    Json(body): Json<UserInputsBody>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let conversation = state
        .conversation_service
        .create_with_title(&body.user_inputs)
        .await?;
    Ok(Json(ApiResponse::success(conversation, start)))
}

/// POST /api/conversations/generate-title
pub async fn generate_title(
    State(state): State<AppState>,
    Json(body): Json<UserInputsBody>,
) -> Result<Json<ApiResponse<GeneratedTitle>>, AppError> {
    let start = Instant::now();
    let title = state
        .conversation_service
        .generate_title(&body.user_inputs)
        .await?;
    Ok(Json(ApiResponse::success(GeneratedTitle { title }, start)))
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConversationDetail>>, AppError> {
    let start = Instant::now();
    let detail = state.conversation_service.get_detail(&id).await?;
    Ok(Json(ApiResponse::success(detail, start)))
}

/// PUT /api/conversations/{id}
pub async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateConversationBody>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let conversation = state
        .conversation_service
        .update(&id, &body.title, body.last_document_id)
        .await?;
    Ok(Json(ApiResponse::success(conversation, start)))
}

/// PUT /api/conversations/{id}/title
pub async fn update_title(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTitleBody>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let conversation = state
        .conversation_service
        .update_title(&id, &body.title)
        .await?;
    Ok(Json(ApiResponse::success(conversation, start)))
}

/// DELETE /api/conversations/{id}
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedConversation>>, AppError> {
    let start = Instant::now();
    let documents_deleted = state.conversation_service.delete(&id).await?;
    Ok(Json(ApiResponse::success(
        DeletedConversation {
            id,
            documents_deleted,
        },
        start,
    )))
}
