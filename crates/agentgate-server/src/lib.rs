//! agentgate HTTP server: chat and research endpoints over axum.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
