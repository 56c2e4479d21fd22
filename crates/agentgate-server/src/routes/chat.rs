//! Chat completion endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info};

use agentgate_chat::ChatRequest;

use super::sse::chunk_sse;
use crate::error::ApiError;
use crate::middleware::request_id;
use crate::state::AppState;

const QUERY_LOG_CHARS: usize = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// First characters of `text` for log lines.
pub(crate) fn preview(text: &str) -> String {
    match text.char_indices().nth(QUERY_LOG_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Response {
    let request_id = request_id(&headers);
    let query = req.messages.last().map(|m| m.content.as_str()).unwrap_or_default();
    info!(
        request_id = %request_id,
        "Processing chat request: query={:?} model={:?} stream={}",
        preview(query),
        req.model_name,
        req.stream
    );

    if req.stream {
        return match state.chat.stream(&req.messages, req.model_name.as_deref()) {
            Ok(chunks) => chunk_sse(chunks, request_id, "chat").into_response(),
            Err(e) => {
                error!(request_id = %request_id, "Rejected streaming request: {}", e);
                ApiError::from(e).into_response()
            }
        };
    }

    match state.chat.complete(&req.messages, req.model_name.as_deref()).await {
        Ok(response) => {
            info!(request_id = %request_id, "Completed chat request with model {}", response.model);
            Json(response).into_response()
        }
        Err(e) => {
            error!(request_id = %request_id, "Error processing chat request: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
