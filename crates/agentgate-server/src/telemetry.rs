//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use agentgate_core::GatewayConfig;

/// Filter from `RUST_LOG`, else the configured level with noisy HTTP
/// crates capped at `warn`.
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},hyper=warn,reqwest=warn,tower_http=warn",
            log_level.to_ascii_lowercase()
        ))
    })
}

/// Install the global subscriber. JSON lines in production.
pub fn init(config: &GatewayConfig) {
    let filter = env_filter(&config.log_level);
    if config.environment.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
