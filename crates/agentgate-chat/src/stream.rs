//! Channel-backed chunk stream.
//!
//! A producer task pushes chunks into a bounded channel and the consumer
//! pulls them. Dropping the consumer closes the channel; the producer sees
//! the failed send and stops pulling from the agent.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::agent::{AgentOutput, AgentStream, DeltaTracker};
use crate::error::{AgentError, ChatError};
use crate::types::StreamingChunk;

/// Incremental chunks from a running agent stream.
///
/// Yields zero or more `done = false` chunks and then exactly one
/// `done = true` chunk. After the last chunk, [`ChunkStream::finish`]
/// reports whether production failed.
pub struct ChunkStream {
    rx: mpsc::Receiver<StreamingChunk>,
    producer: JoinHandle<Result<(), ChatError>>,
}

/// How a failure is rendered as the terminal chunk.
pub type ErrorChunkFn = fn(&AgentError, &str) -> StreamingChunk;

impl ChunkStream {
    /// Spawn a producer that drives `start` and normalizes what it yields.
    pub fn spawn<F>(model: String, buffer: usize, start: F) -> Self
    where
        F: Future<Output = Result<AgentStream, AgentError>> + Send + 'static,
    {
        Self::spawn_with(model, buffer, start, |e, model| StreamingChunk::error(e, model))
    }

    /// Like [`ChunkStream::spawn`] with a custom terminal error chunk.
    pub fn spawn_with<F>(model: String, buffer: usize, start: F, on_error: ErrorChunkFn) -> Self
    where
        F: Future<Output = Result<AgentStream, AgentError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let producer = tokio::spawn(produce(tx, model, start, on_error));
        Self { rx, producer }
    }

    /// A stream that yields one terminal error chunk and then reports
    /// `error` from [`ChunkStream::finish`].
    pub fn failed(chunk: StreamingChunk, error: AgentError) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let producer = tokio::spawn(async move {
            let _ = tx.send(chunk).await;
            Err(ChatError::Streaming(error))
        });
        Self { rx, producer }
    }

    /// Receive the next chunk.
    pub async fn recv(&mut self) -> Option<StreamingChunk> {
        self.rx.recv().await
    }

    /// Wait for the producer and surface its failure, if any.
    pub async fn finish(self) -> Result<(), ChatError> {
        drop(self.rx);
        match self.producer.await {
            Ok(result) => result,
            Err(e) => Err(ChatError::Streaming(AgentError::Other(format!(
                "stream producer aborted: {}",
                e
            )))),
        }
    }

    /// Drain every chunk, then report the outcome.
    pub async fn collect(mut self) -> (Vec<StreamingChunk>, Result<(), ChatError>) {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.recv().await {
            chunks.push(chunk);
        }
        let outcome = self.finish().await;
        (chunks, outcome)
    }
}

impl Stream for ChunkStream {
    type Item = StreamingChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

async fn produce<F>(
    tx: mpsc::Sender<StreamingChunk>,
    model: String,
    start: F,
    on_error: ErrorChunkFn,
) -> Result<(), ChatError>
where
    F: Future<Output = Result<AgentStream, AgentError>> + Send,
{
    use tokio_stream::StreamExt;

    let mut outputs = match start.await {
        Ok(stream) => stream,
        Err(e) => return fail(&tx, &model, e, on_error).await,
    };

    let mut tracker = DeltaTracker::new();

    while let Some(item) = outputs.next().await {
        let output: AgentOutput = match item {
            Ok(output) => output,
            Err(e) => return fail(&tx, &model, e, on_error).await,
        };

        let delta = tracker.delta(output);
        if delta.is_empty() {
            continue;
        }

        if delta.len() > 20 {
            let preview: String = delta.chars().take(20).collect();
            debug!("Streaming chunk: {}...", preview);
        } else {
            debug!("Streaming chunk: {}", delta);
        }

        if tx.send(StreamingChunk::delta(delta, &model)).await.is_err() {
            debug!("Stream consumer for model {} went away, stopping", model);
            return Ok(());
        }
    }

    let _ = tx.send(StreamingChunk::terminal(&model)).await;
    Ok(())
}

async fn fail(
    tx: &mpsc::Sender<StreamingChunk>,
    model: &str,
    error: AgentError,
    on_error: ErrorChunkFn,
) -> Result<(), ChatError> {
    let _ = tx.send(on_error(&error, model)).await;
    Err(ChatError::Streaming(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn outputs(items: Vec<Result<AgentOutput, AgentError>>) -> AgentStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_deltas_then_terminal() {
        let chunks = ChunkStream::spawn("m".into(), 4, async {
            Ok(outputs(vec![
                Ok(AgentOutput::Text("Hel".into())),
                Ok(AgentOutput::Delta { delta: String::new() }),
                Ok(AgentOutput::Content { content: "Hello".into() }),
                Ok(AgentOutput::Delta { delta: "!".into() }),
            ]))
        });

        let (chunks, outcome) = chunks.collect().await;
        assert!(outcome.is_ok());
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["Hel", "lo", "!", ""]);
        assert!(chunks[..3].iter().all(|c| !c.done));
        assert!(chunks[3].done);
        assert!(chunks.iter().all(|c| c.model == "m"));
    }

    #[tokio::test]
    async fn test_empty_stream_yields_only_terminal() {
        let chunks = ChunkStream::spawn("m".into(), 4, async { Ok(outputs(Vec::new())) });
        let (chunks, outcome) = chunks.collect().await;
        assert!(outcome.is_ok());
        assert_eq!(chunks, vec![StreamingChunk::terminal("m")]);
    }

    #[tokio::test]
    async fn test_start_failure_is_single_error_chunk() {
        let chunks = ChunkStream::spawn("m".into(), 4, async {
            Err(AgentError::Transport("connection refused".into()))
        });
        let (chunks, outcome) = chunks.collect().await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].done);
        assert_eq!(chunks[0].content, "\n\nError: Request failed: connection refused");
        assert!(matches!(outcome, Err(ChatError::Streaming(AgentError::Transport(_)))));
    }

    #[tokio::test]
    async fn test_custom_error_chunk() {
        let chunks = ChunkStream::spawn_with(
            "m".into(),
            4,
            async { Err(AgentError::Other("nope".into())) },
            |e, model| StreamingChunk {
                content: format!("custom: {}", e),
                done: true,
                model: model.to_string(),
            },
        );
        let (chunks, _) = chunks.collect().await;
        assert_eq!(chunks[0].content, "custom: nope");
    }

    #[tokio::test]
    async fn test_failed_stream_reports_error() {
        let chunk = StreamingChunk::error("no backend", "m");
        let stream = ChunkStream::failed(chunk.clone(), AgentError::Other("no backend".into()));

        let (chunks, outcome) = stream.collect().await;
        assert_eq!(chunks, vec![chunk]);
        match outcome {
            Err(ChatError::Streaming(e)) => assert_eq!(e, AgentError::Other("no backend".into())),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
