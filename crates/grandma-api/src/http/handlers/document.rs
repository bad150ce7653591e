//! Document handlers: cursor-paginated listing, batch fetch, edit, delete.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use grandma_types::chat::Document;

use crate::http::error::AppError;
use crate::http::extractors::query::DocumentListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub document_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContentBody {
    pub content: String,
}

/// GET /api/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<ApiResponse<Vec<Document>>>, AppError> {
    let start = Instant::now();
    let cursor = query.cursor()?;
    let documents = state
        .document_service
        .list(&query.conversation_id, cursor.as_ref(), query.limit)
        .await?;
    Ok(Json(ApiResponse::success(documents, start)))
}

/// GET /api/documents/ids
pub async fn list_document_ids(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<ApiResponse<Vec<Uuid>>>, AppError> {
    let start = Instant::now();
    let cursor = query.cursor()?;
    let ids = state
        .document_service
        .list_ids(&query.conversation_id, cursor.as_ref(), query.limit)
        .await?;
    Ok(Json(ApiResponse::success(ids, start)))
}

/// POST /api/documents/batch
pub async fn get_documents_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchBody>,
) -> Result<Json<ApiResponse<Vec<Document>>>, AppError> {
    let start = Instant::now();
    let documents = state.document_service.get_batch(&body.document_ids).await?;
    Ok(Json(ApiResponse::success(documents, start)))
}

/// GET /api/documents/{id}
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Document>>, AppError> {
    let start = Instant::now();
    let document = state.document_service.get(&id).await?;
    Ok(Json(ApiResponse::success(document, start)))
}

/// PUT /api/documents/{id}
pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateContentBody>,
) -> Result<Json<ApiResponse<Document>>, AppError> {
    let start = Instant::now();
    let document = state
        .document_service
        .update_content(&id, &body.content)
        .await?;
    Ok(Json(ApiResponse::success(document, start)))
}

/// DELETE /api/documents/{id}
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    state.document_service.delete(&id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": id, "deleted": true }),
        start,
    )))
}
