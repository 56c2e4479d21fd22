//! Request middleware: request ids, access logging and trusted hosts.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The caller's `X-Request-ID`, or a fresh UUID.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Log method, path, status and latency of every request.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = request_id(req.headers());

    info!(request_id = %request_id, "Request: {} {}", method, path);
    let response = next.run(req).await;
    info!(
        request_id = %request_id,
        "Response: {} {} -> {} in {:.2}ms",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    response
}

/// Whether `host` (with optional port) matches an allowed host pattern.
///
/// `*` allows everything and `*.example.com` allows subdomains.
pub fn host_allowed(host: &str, allowed: &[String]) -> bool {
    let name = strip_port(host).to_ascii_lowercase();
    allowed.iter().any(|pattern| {
        let pattern = pattern.trim().to_ascii_lowercase();
        if pattern == "*" {
            return true;
        }
        match pattern.strip_prefix("*.") {
            Some(suffix) => name.ends_with(&format!(".{}", suffix)),
            None => name == pattern,
        }
    })
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split(']').next().map(|h| &h[1..]).unwrap_or(host);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Reject requests whose `Host` header is not in the allow list.
pub async fn trusted_hosts(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let host = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !host_allowed(host, &state.config.allowed_hosts) {
        warn!("Rejected request with untrusted host {:?}", host);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Invalid host header" })),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn hosts(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_host_allowed() {
        let allowed = hosts(&["localhost", "*.example.com"]);
        assert!(host_allowed("localhost:8000", &allowed));
        assert!(host_allowed("LOCALHOST", &allowed));
        assert!(host_allowed("api.example.com", &allowed));
        assert!(!host_allowed("example.com", &allowed));
        assert!(!host_allowed("evil.com", &allowed));
        assert!(!host_allowed("", &allowed));
        assert!(host_allowed("anything", &hosts(&["*"])));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("[::1]:8000"), "::1");
        assert_eq!(strip_port("host:80"), "host");
        assert_eq!(strip_port("host"), "host");
    }

    #[test]
    fn test_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(request_id(&headers), "abc-123");

        let generated = request_id(&HeaderMap::new());
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
    }
}
