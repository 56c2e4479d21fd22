//! agentgate core: configuration and shared error types.

pub mod config;
pub mod error;

pub use config::{Environment, GatewayConfig, RetrySettings};
pub use error::{Error, Result};
