//! Gateway configuration loaded from the environment.
//!
//! An optional `.env` file is read first; real environment variables win.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_STREAM_BUFFER: usize = 32;
pub const DEFAULT_PRODUCTION_ORIGIN: &str = "https://your-domain.com";
pub const DEFAULT_PRODUCTION_HOST: &str = "your-domain.com";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Retry settings for non-streaming completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt. Doubles for each further attempt.
    pub base_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Credential for the LLM provider.
    #[serde(skip_serializing)]
    pub openai_api_key: String,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Model used when a request does not name one.
    pub model_name: String,
    /// Credential for Exa search. Research is disabled without it.
    #[serde(skip_serializing)]
    pub exa_api_key: Option<String>,
    pub environment: Environment,
    pub cors_origins: Vec<String>,
    /// Hosts accepted in production.
    pub allowed_hosts: Vec<String>,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    /// Capacity of the chunk channel behind each stream.
    pub stream_buffer: usize,
    pub retry: RetrySettings,
}

impl GatewayConfig {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("Failed to read .env: {}", e))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = var("OPENAI_API_KEY")
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is required".into()))?;

        let environment = var("ENVIRONMENT")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let cors_origins = match environment {
            Environment::Development => vec!["*".to_string()],
            Environment::Production => var("CORS_ORIGINS")
                .map(|v| split_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_PRODUCTION_ORIGIN.to_string()]),
        };

        let allowed_hosts = var("ALLOWED_HOSTS")
            .map(|v| split_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| {
                vec![DEFAULT_PRODUCTION_HOST.to_string(), "localhost".to_string()]
            });

        let port = parse_var(&var, "PORT")?.unwrap_or(DEFAULT_PORT);
        let stream_buffer: usize =
            parse_var(&var, "STREAM_BUFFER")?.unwrap_or(DEFAULT_STREAM_BUFFER);
        if stream_buffer == 0 {
            return Err(Error::Config("STREAM_BUFFER must be at least 1".into()));
        }

        let mut retry = RetrySettings::default();
        if let Some(attempts) = parse_var::<u32>(&var, "RETRY_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(Error::Config("RETRY_MAX_ATTEMPTS must be at least 1".into()));
            }
            retry.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>(&var, "RETRY_BASE_DELAY_MS")? {
            retry.base_delay = Duration::from_millis(ms);
        }

        let api_prefix = var("API_PREFIX")
            .map(|p| normalize_prefix(&p))
            .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string());

        Ok(Self {
            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model_name: var("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            exa_api_key: var("EXA_API_KEY"),
            environment,
            cors_origins,
            allowed_hosts,
            log_level: var("LOG_LEVEL")
                .map(|l| l.to_ascii_lowercase())
                .unwrap_or_else(|| "info".to_string()),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            api_prefix,
            stream_buffer,
            retry,
        })
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn research_enabled(&self) -> bool {
        self.exa_api_key.is_some()
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(None),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
