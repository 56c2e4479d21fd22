//! Research endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use agentgate_chat::ChatMessage;
use agentgate_research::{ResearchReply, ResearchRequest, ResearchResponse};

use super::chat::preview;
use super::sse::chunk_sse;
use crate::error::ApiError;
use crate::middleware::request_id;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/research", post(research))
}

async fn research(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ResearchRequest>,
) -> Response {
    let request_id = request_id(&headers);
    info!(
        request_id = %request_id,
        "Processing research request: query={:?} stream={}",
        preview(&req.query),
        req.stream
    );

    match state
        .research
        .research(&req.query, req.stream, req.model_name.as_deref())
        .await
    {
        ResearchReply::Complete(chunk) => Json(ResearchResponse {
            message: ChatMessage::assistant(chunk.content),
            model: chunk.model,
            usage: None,
        })
        .into_response(),
        ResearchReply::Failed(chunk) => ApiError::Internal(chunk.content).into_response(),
        ResearchReply::Stream(chunks) => chunk_sse(chunks, request_id, "research").into_response(),
    }
}
