//! Completion and streaming adapters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agentgate_core::RetrySettings;
use tracing::{debug, error, info, warn};

use crate::error::ChatError;
use crate::registry::AgentRegistry;
use crate::stream::ChunkStream;
use crate::types::{ChatMessage, ChatResponse};

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after `failures` consecutive failures.
    pub fn delay_after(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySettings::default().into()
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay,
        }
    }
}

/// Drives cached agents for chat requests.
#[derive(Clone)]
pub struct ChatService {
    registry: Arc<AgentRegistry>,
    retry: RetryPolicy,
    stream_buffer: usize,
}

impl ChatService {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            retry: RetryPolicy::default(),
            stream_buffer: agentgate_core::config::DEFAULT_STREAM_BUFFER,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_stream_buffer(mut self, buffer: usize) -> Self {
        self.stream_buffer = buffer.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run a non-streaming completion for the last message.
    ///
    /// Only the final message is forwarded; earlier turns are not replayed.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        model_name: Option<&str>,
    ) -> Result<ChatResponse, ChatError> {
        let start = Instant::now();
        let prompt = last_prompt(messages)?;
        let model = self.registry.resolve_model(model_name);
        info!("Using model: {} with streaming=false", model);

        let agent = self.registry.get_agent(Some(&model));
        let max_attempts = self.retry.max_attempts;
        let mut failures = 0u32;

        loop {
            debug!(
                "Sending request to agent with model {} (attempt {}/{})",
                model,
                failures + 1,
                max_attempts
            );

            match agent.run(prompt).await {
                Ok(output) => {
                    info!(
                        "Processed request with model {} in {:.2} seconds",
                        model,
                        start.elapsed().as_secs_f64()
                    );
                    return Ok(ChatResponse {
                        message: ChatMessage::assistant(output.into_text()),
                        model,
                        usage: None,
                    });
                }
                Err(e) => {
                    failures += 1;
                    if failures >= max_attempts {
                        error!(
                            "Failed to get response from model {} after {} attempts: {}",
                            model, max_attempts, e
                        );
                        return Err(ChatError::Agent(e));
                    }
                    let backoff = self.retry.delay_after(failures);
                    warn!(
                        "Error with agent (model: {}), retrying in {:?}: {}",
                        model, backoff, e
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Stream a completion for the last message as incremental chunks.
    ///
    /// Input is validated before the stream starts. Failures after that
    /// become a terminal error chunk and are reported by
    /// [`ChunkStream::finish`].
    pub fn stream(
        &self,
        messages: &[ChatMessage],
        model_name: Option<&str>,
    ) -> Result<ChunkStream, ChatError> {
        let prompt = last_prompt(messages)?.to_string();
        let model = self.registry.resolve_model(model_name);
        info!("Using model: {} with streaming=true", model);

        let agent = self.registry.get_agent(Some(&model));
        debug!("Starting streaming response with model {}", model);

        Ok(ChunkStream::spawn(model, self.stream_buffer, async move {
            agent.run_stream(&prompt).await
        }))
    }
}

/// Content of the final message, rejecting empty input.
fn last_prompt(messages: &[ChatMessage]) -> Result<&str, ChatError> {
    let last = messages
        .last()
        .ok_or_else(|| ChatError::InvalidInput("No messages provided in request".into()))?;
    if last.content.trim().is_empty() {
        return Err(ChatError::InvalidInput("Empty message content".into()));
    }
    Ok(&last.content)
}
