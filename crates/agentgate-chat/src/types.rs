//! Chat request and response shapes.

use serde::{Deserialize, Serialize};

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Incoming chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Accepted for compatibility; not enforced.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

fn default_max_tokens() -> Option<u32> {
    Some(1000)
}

/// Non-streaming chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub model: String,
    /// Always empty; the agent does not report usage.
    pub usage: Option<serde_json::Value>,
}

/// One incremental unit of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingChunk {
    pub content: String,
    pub done: bool,
    pub model: String,
}

impl StreamingChunk {
    pub fn delta(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
            model: model.into(),
        }
    }

    /// Empty terminal chunk.
    pub fn terminal(model: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            done: true,
            model: model.into(),
        }
    }

    /// Terminal chunk carrying an error message.
    pub fn error(message: impl std::fmt::Display, model: impl Into<String>) -> Self {
        Self {
            content: format!("\n\nError: {}", message),
            done: true,
            model: model.into(),
        }
    }
}
