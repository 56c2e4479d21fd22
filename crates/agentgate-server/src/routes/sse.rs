//! Server-sent event framing for chunk streams.

use std::convert::Infallible;
use std::pin::Pin;

use axum::response::sse::{Event, Sse};
use futures::Stream;
use tracing::{error, info};

use agentgate_chat::{ChunkStream, StreamingChunk};

pub type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// One `data: <json>` event.
pub fn chunk_event(chunk: &StreamingChunk) -> Event {
    match serde_json::to_string(chunk) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            error!("Failed to encode chunk: {}", e);
            Event::default().data(r#"{"content":"","done":true,"model":""}"#)
        }
    }
}

/// Forward every chunk until the terminal one, then report how the
/// producer ended.
pub fn chunk_sse(
    mut chunks: ChunkStream,
    request_id: String,
    label: &'static str,
) -> Sse<SseStream> {
    let stream: SseStream = Box::pin(async_stream::stream! {
        let mut sent = 0usize;
        while let Some(chunk) = chunks.recv().await {
            let done = chunk.done;
            sent += 1;
            yield Ok::<_, Infallible>(chunk_event(&chunk));
            if done {
                break;
            }
        }

        match chunks.finish().await {
            Ok(()) => info!(
                request_id = %request_id,
                "Completed {} stream ({} chunks)", label, sent
            ),
            Err(e) => error!(
                request_id = %request_id,
                "Error processing {} stream: {}", label, e
            ),
        }
    });
    Sse::new(stream)
}
