//! HTTP route handlers.

pub mod chat;
pub mod research;
pub mod status;
mod sse;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::middleware::{log_requests, trusted_hosts};
use crate::state::AppState;

/// Build the main router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = api_routes();
    let prefix = state.config.api_prefix.trim_end_matches('/').to_string();

    let mut router = Router::new().route("/", get(root));
    router = if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(&prefix, api)
    };

    if state.config.environment.is_production() {
        router = router.layer(middleware::from_fn_with_state(state.clone(), trusted_hosts));
    }

    router
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::routes())
        .merge(research::routes())
        .merge(status::routes())
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to agentgate",
        "status": "healthy",
    }))
}

/// CORS for the configured origins; `*` allows any origin without credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(parsed))
        .allow_credentials(true)
}
