//! Streaming chat endpoint.
//!
//! POST /api/chat
//!
//! Setup (provider selection, conversation, user turn, empty assistant
//! document) runs inside the handler so its failures come back as JSON
//! errors. The streaming phase then runs in its own task, decoupled from
//! the response body: if the client goes away the task keeps persisting.
//! It is tracked in [`AppState::streams`] so shutdown waits for its final
//! flush.
//!
//! The body is raw text deltas followed by one trailer:
//!
//! ```text
//! Hello there, dear.
//!
//! <GRANDMA_METADATA>{"conversation_id":"..","document_id":".."}</GRANDMA_METADATA>
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use grandma_types::chat::ChatRequest;

use crate::http::error::AppError;
use crate::state::AppState;

pub const METADATA_OPEN: &str = "<GRANDMA_METADATA>";
pub const METADATA_CLOSE: &str = "</GRANDMA_METADATA>";

/// Deltas buffered between the stream task and the response body.
const RELAY_CAPACITY: usize = 64;

/// The metadata block appended after the last delta.
pub fn trailer(conversation_id: Uuid, document_id: Uuid, error: Option<&str>) -> String {
    let mut metadata = serde_json::json!({
        "conversation_id": conversation_id,
        "document_id": document_id,
    });
    if let Some(error) = error {
        metadata["error"] = serde_json::Value::from(error);
    }
    format!("\n\n{METADATA_OPEN}{metadata}{METADATA_CLOSE}")
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let turn = state.chat_service.begin(request).await?;
    let conversation_id = turn.conversation_id;
    let document_id = turn.document_id;

    let (relay, rx) = mpsc::channel::<String>(RELAY_CAPACITY);
    let trailer_tx = relay.clone();
    let service = Arc::clone(&state.chat_service);
    let cancel = state.shutdown.child_token();

    state.streams.spawn(async move {
        let error = match service.stream(turn, relay, cancel).await {
            Ok(outcome) => outcome.stream_error,
            Err(e) => Some(e.to_string()),
        };
        if trailer_tx
            .send(trailer(conversation_id, document_id, error.as_deref()))
            .await
            .is_err()
        {
            tracing::debug!(%conversation_id, "client gone before trailer");
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    let mut response = (
        [
            (header::CONTENT_TYPE, "text/event-stream; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response();

    let headers = response.headers_mut();
    for (name, id) in [("x-conversation-id", conversation_id), ("x-document-id", document_id)] {
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            headers.insert(name, value);
        }
    }
    Ok(response)
}
