//! GET /api/models

use std::time::Instant;

use axum::Json;
use axum::extract::State;

use grandma_types::llm::ModelAlias;

use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Selectable model aliases and whether each family has a key.
pub async fn list_models(State(state): State<AppState>) -> Json<ApiResponse<Vec<ModelAlias>>> {
    let start = Instant::now();
    Json(ApiResponse::success(state.providers.aliases(), start))
}
