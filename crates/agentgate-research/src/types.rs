//! Research request and response shapes.

use serde::{Deserialize, Serialize};

use agentgate_chat::ChatMessage;

/// Incoming research request.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    /// Falls back to the configured model when absent.
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

/// Non-streaming research response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub message: ChatMessage,
    pub model: String,
    pub usage: Option<serde_json::Value>,
}
