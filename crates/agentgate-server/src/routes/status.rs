//! Gateway status.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(status))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let registry = state.chat.registry();
    let retry = state.chat.retry_policy();
    Json(json!({
        "status": "healthy",
        "environment": state.config.environment.to_string(),
        "defaultModel": registry.default_model(),
        "cachedModels": registry.models(),
        "researchEnabled": state.research.is_enabled(),
        "retry": {
            "maxAttempts": retry.max_attempts,
            "baseDelayMs": retry.base_delay.as_millis() as u64,
        },
    }))
}
