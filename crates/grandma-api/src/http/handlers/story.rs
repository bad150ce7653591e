//! Story handlers.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use grandma_types::story::{NewStory, Story};

use crate::http::error::AppError;
use crate::http::extractors::query::StoryListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/stories
pub async fn list_stories(
    State(state): State<AppState>,
    Query(query): Query<StoryListQuery>,
) -> Result<Json<ApiResponse<Vec<Story>>>, AppError> {
    let start = Instant::now();
    let stories = state.story_service.list(query.guid.as_deref()).await?;
    Ok(Json(ApiResponse::success(stories, start)))
}

/// POST /api/stories
pub async fn create_story(
    State(state): State<AppState>,
    Json(body): Json<NewStory>,
) -> Result<Json<ApiResponse<Story>>, AppError> {
    let start = Instant::now();
    let story = state.story_service.create(body).await?;
    Ok(Json(ApiResponse::success(story, start)))
}

/// DELETE /api/stories/{id}
pub async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    state.story_service.delete(&id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": id, "deleted": true }),
        start,
    )))
}
