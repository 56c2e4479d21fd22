//! Agent and adapter errors.

use thiserror::Error;

/// Failure reported by an agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AgentError::Decode(e.to_string())
        } else {
            AgentError::Transport(e.to_string())
        }
    }
}

/// Failure surfaced by the chat adapters.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Empty message list or blank final message. Never retried.
    #[error("{0}")]
    InvalidInput(String),

    /// Non-streaming call failed on every attempt; carries the last error.
    #[error(transparent)]
    Agent(AgentError),

    /// Stream production failed after it started.
    #[error("Streaming failed: {0}")]
    Streaming(AgentError),
}

impl ChatError {
    /// The agent error underneath, if any.
    pub fn agent_error(&self) -> Option<&AgentError> {
        match self {
            ChatError::InvalidInput(_) => None,
            ChatError::Agent(e) | ChatError::Streaming(e) => Some(e),
        }
    }
}

impl From<AgentError> for ChatError {
    fn from(e: AgentError) -> Self {
        ChatError::Agent(e)
    }
}
