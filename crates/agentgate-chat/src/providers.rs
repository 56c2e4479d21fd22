//! OpenAI-compatible chat completions agent.
//!
//! Non-streaming calls return the first choice's message content. Streaming
//! calls read the SSE body line by line and yield each content delta.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::debug;

use crate::agent::{Agent, AgentFactory, AgentHandle, AgentOutput, AgentStream};
use crate::error::AgentError;
use crate::types::{ChatMessage, Role};

pub const DEFAULT_DESCRIPTION: &str =
    "You are a helpful assistant that provides clear and concise answers.";

const MARKDOWN_INSTRUCTION: &str = "Use markdown to format your answers.";

/// Agent backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiAgent {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl OpenAiAgent {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: system_prompt(DEFAULT_DESCRIPTION, None, true),
        }
    }

    /// Replace the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(&self, prompt: &str, stream: bool) -> Value {
        let messages = [
            ChatMessage::new(Role::System, self.system_prompt.clone()),
            ChatMessage::user(prompt),
        ];
        json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        })
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, AgentError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt, stream))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api { status, body });
        }

        Ok(response)
    }
}

/// Assemble a system prompt from a description, optional instructions and
/// the markdown hint.
pub fn system_prompt(description: &str, instructions: Option<&str>, markdown: bool) -> String {
    let mut parts = vec![description.trim().to_string()];
    if let Some(instructions) = instructions {
        let trimmed = instructions.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }
    if markdown {
        parts.push(MARKDOWN_INSTRUCTION.to_string());
    }
    parts.join("\n\n")
}

#[async_trait]
impl Agent for OpenAiAgent {
    fn model(&self) -> &str {
        &self.model
    }

    async fn run(&self, prompt: &str) -> Result<AgentOutput, AgentError> {
        debug!("Requesting completion from {} with model {}", self.base_url, self.model);
        let response = self.send(prompt, false).await?;
        let body: Value = response.json().await?;

        let message = &body["choices"][0]["message"];
        match &message["content"] {
            Value::String(content) => Ok(AgentOutput::Content {
                content: content.clone(),
            }),
            Value::Null if message.is_object() => Ok(AgentOutput::Text(String::new())),
            _ => Err(AgentError::Decode(format!("No choices in response: {}", body))),
        }
    }

    async fn run_stream(&self, prompt: &str) -> Result<AgentStream, AgentError> {
        debug!("Streaming from {} with model {}", self.base_url, self.model);
        let response = self.send(prompt, true).await?;

        let stream = async_stream::stream! {
            let mut bytes = response.bytes_stream();
            let mut lines = SseLineBuffer::default();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(AgentError::Transport(format!("Stream read error: {}", e)));
                        return;
                    }
                };

                for event in lines.push(&chunk) {
                    match event {
                        SseData::Done => return,
                        SseData::Json(parsed) => {
                            if let Some(message) = parsed["error"]["message"].as_str() {
                                yield Err(AgentError::Other(message.to_string()));
                                return;
                            }
                            let delta = &parsed["choices"][0]["delta"]["content"];
                            if let Some(content) = delta.as_str().filter(|c| !c.is_empty()) {
                                yield Ok(AgentOutput::Delta {
                                    delta: content.to_string(),
                                });
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// One parsed `data:` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SseData {
    Json(Value),
    Done,
}

/// Accumulates raw SSE bytes and yields complete `data:` payloads.
///
/// Lines are decoded only once complete, so a multi-byte character split
/// across network reads stays intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Feed bytes; returns every payload completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseData> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line.trim(),
                Err(e) => {
                    debug!("Skipping SSE line with invalid UTF-8: {}", e);
                    continue;
                }
            };

            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if data == "[DONE]" {
                    out.push(SseData::Done);
                } else if let Ok(parsed) = serde_json::from_str::<Value>(data) {
                    out.push(SseData::Json(parsed));
                }
            }
        }

        out
    }
}

/// Builds [`OpenAiAgent`]s sharing one HTTP client.
pub struct OpenAiAgentFactory {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiAgentFactory {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl AgentFactory for OpenAiAgentFactory {
    fn create(&self, model: &str) -> AgentHandle {
        Arc::new(OpenAiAgent::new(
            self.client.clone(),
            self.base_url.clone(),
            self.api_key.clone(),
            model,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_buffer_split_lines() {
        let mut buf = SseLineBuffer::default();
        assert!(buf.push(b"data: {\"choices\":[{\"delta\":{\"con").is_empty());
        let events = buf.push(b"tent\":\"Hi\"}}]}\n\n: keep-alive\n");
        assert_eq!(events.len(), 1);
        match &events[0] {
            SseData::Json(v) => assert_eq!(v["choices"][0]["delta"]["content"], "Hi"),
            other => panic!("unexpected event: {:?}", other),
        }

        let events = buf.push(b"data: not json\ndata: [DONE]\n");
        assert_eq!(events, vec![SseData::Done]);
    }

    #[test]
    fn test_sse_buffer_crlf_and_no_space() {
        let mut buf = SseLineBuffer::default();
        let events = buf.push(b"data:{\"a\":1}\r\n\r\n");
        assert_eq!(events, vec![SseData::Json(json!({"a": 1}))]);
    }

    #[test]
    fn test_sse_buffer_multibyte_split_across_reads() {
        let mut buf = SseLineBuffer::default();
        assert!(buf
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xC3")
            .is_empty());
        let events = buf.push(b"\xA9\"}}]}\n");
        match &events[..] {
            [SseData::Json(v)] => assert_eq!(v["choices"][0]["delta"]["content"], "café"),
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_system_prompt() {
        assert_eq!(
            system_prompt(DEFAULT_DESCRIPTION, None, true),
            format!("{}\n\n{}", DEFAULT_DESCRIPTION, MARKDOWN_INSTRUCTION)
        );
        assert_eq!(system_prompt(" desc ", Some("  "), false), "desc");
        assert_eq!(system_prompt("desc", Some("1. do"), false), "desc\n\n1. do");
    }

    #[test]
    fn test_request_body() {
        let agent = OpenAiAgent::new(Client::new(), "http://localhost/v1/", "sk", "gpt-4");
        assert_eq!(agent.endpoint(), "http://localhost/v1/chat/completions");

        let body = agent.request_body("hello", true);
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_factory_binds_model() {
        let factory = OpenAiAgentFactory::new(Client::new(), "http://localhost/v1", "sk");
        let agent = factory.create("gpt-4o-mini");
        assert_eq!(agent.model(), "gpt-4o-mini");
    }
}
