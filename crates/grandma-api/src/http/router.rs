//! Axum router configuration with middleware.
//!
//! Routes live under `/api/`; `/health` sits outside it.
//! Middleware: CORS and request tracing.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::chat))
        // Conversations
        .route(
            "/conversations",
            get(handlers::conversation::list_conversations)
                .post(handlers::conversation::create_conversation),
        )
        .route(
            "/conversations/new",
            post(handlers::conversation::create_default_conversation),
        )
        .route(
            "/conversations/new-with-title",
            post(handlers::conversation::create_conversation_with_title),
        )
        .route(
            "/conversations/generate-title",
            post(handlers::conversation::generate_title),
        )
        .route(
            "/conversations/{id}",
            get(handlers::conversation::get_conversation)
                .put(handlers::conversation::update_conversation)
                .delete(handlers::conversation::delete_conversation),
        )
        .route(
            "/conversations/{id}/title",
            put(handlers::conversation::update_title),
        )
        // Documents
        .route("/documents", get(handlers::document::list_documents))
        .route("/documents/ids", get(handlers::document::list_document_ids))
        .route("/documents/batch", post(handlers::document::get_documents_batch))
        .route(
            "/documents/{id}",
            get(handlers::document::get_document)
                .put(handlers::document::update_document)
                .delete(handlers::document::delete_document),
        )
        // Stories
        .route(
            "/stories",
            get(handlers::story::list_stories).post(handlers::story::create_story),
        )
        .route(
            "/stories/{id}",
            axum::routing::delete(handlers::story::delete_story),
        )
        .route("/models", get(handlers::models::list_models));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
