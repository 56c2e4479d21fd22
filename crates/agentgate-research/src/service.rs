//! Research adapter.
//!
//! No retries. Every failure ends the reply with one `done = true` chunk
//! whose content describes the error.

use std::sync::Arc;

use tracing::{error, info};

use agentgate_chat::{AgentError, AgentRegistry, ChunkStream, StreamingChunk};

/// Result of a research call.
pub enum ResearchReply {
    /// Non-streaming success; `done = true`.
    Complete(StreamingChunk),
    /// Non-streaming failure; `done = true`, content describes the error.
    Failed(StreamingChunk),
    /// Streaming mode.
    Stream(ChunkStream),
}

impl ResearchReply {
    /// The single chunk of a non-streaming reply.
    pub fn chunk(&self) -> Option<&StreamingChunk> {
        match self {
            ResearchReply::Complete(chunk) | ResearchReply::Failed(chunk) => Some(chunk),
            ResearchReply::Stream(_) => None,
        }
    }
}

enum Backend {
    Ready(Arc<AgentRegistry>),
    Disabled { default_model: String, reason: String },
}

/// Runs research queries against cached research agents.
pub struct ResearchService {
    backend: Backend,
    stream_buffer: usize,
}

impl ResearchService {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            backend: Backend::Ready(registry),
            stream_buffer: agentgate_core::config::DEFAULT_STREAM_BUFFER,
        }
    }

    /// A service that answers every query with `reason` as the error.
    pub fn disabled(default_model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            backend: Backend::Disabled {
                default_model: default_model.into(),
                reason: reason.into(),
            },
            stream_buffer: 1,
        }
    }

    pub fn with_stream_buffer(mut self, buffer: usize) -> Self {
        self.stream_buffer = buffer.max(1);
        self
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    fn resolve_model(&self, model_name: Option<&str>) -> String {
        match &self.backend {
            Backend::Ready(registry) => registry.resolve_model(model_name),
            Backend::Disabled { default_model, .. } => model_name
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(default_model.as_str())
                .to_string(),
        }
    }

    /// Research `query`, either as one result or as a chunk stream.
    pub async fn research(
        &self,
        query: &str,
        stream: bool,
        model_name: Option<&str>,
    ) -> ResearchReply {
        let model = self.resolve_model(model_name);
        info!(
            "Starting research for query: query='{}' model_name='{}' stream={}",
            query, model, stream
        );

        let registry = match &self.backend {
            Backend::Ready(registry) => registry,
            Backend::Disabled { reason, .. } => {
                return failure(AgentError::Other(reason.clone()), &model, stream);
            }
        };

        if query.trim().is_empty() {
            return failure(AgentError::Other("Query must not be empty".into()), &model, stream);
        }

        let agent = registry.get_agent(Some(&model));

        if stream {
            let query = query.to_string();
            return ResearchReply::Stream(ChunkStream::spawn_with(
                model,
                self.stream_buffer,
                async move { agent.run_stream(&query).await },
                error_chunk,
            ));
        }

        match agent.run(query).await {
            Ok(output) => ResearchReply::Complete(StreamingChunk {
                content: output.into_text(),
                done: true,
                model,
            }),
            Err(e) => failure(e, &model, false),
        }
    }
}

fn error_chunk(error: &AgentError, model: &str) -> StreamingChunk {
    StreamingChunk {
        content: format!("Error during research: {}", error),
        done: true,
        model: model.to_string(),
    }
}

fn failure(e: AgentError, model: &str, stream: bool) -> ResearchReply {
    error!("Error during research: {}", e);
    let chunk = error_chunk(&e, model);
    if stream {
        ResearchReply::Stream(ChunkStream::failed(chunk, e))
    } else {
        ResearchReply::Failed(chunk)
    }
}
