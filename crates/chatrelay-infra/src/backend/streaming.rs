//! SSE response to [`ChunkStream`] adapter.
//!
//! The backend's streaming call answers with `text/event-stream`, each
//! `data:` payload carrying `{ text, is_complete }`. This module maps that
//! byte stream onto the pull-based chunk stream consumed by the relay
//! orchestrator: nothing is buffered beyond the event currently in flight,
//! so a slow consumer backpressures the HTTP read.

use chatrelay_core::generation::ChunkStream;
use chatrelay_types::generation::{GenerationChunk, GenerationError};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;

use super::types::StreamChunkBody;

/// Terminal sentinel some backends emit after the last chunk.
const DONE_SENTINEL: &str = "[DONE]";

/// Map an established SSE response to a stream of generation chunks.
///
/// The stream ends after the first `is_complete = true` chunk, the done
/// sentinel, or stream exhaustion. Transport and parse failures surface as
/// a terminal `Err` item.
pub fn map_sse_stream(response: reqwest::Response) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| GenerationError::Stream(e.to_string()))?;
            if event.data == DONE_SENTINEL {
                break;
            }

            let body: StreamChunkBody = serde_json::from_str(&event.data).map_err(|e| {
                GenerationError::Deserialization(format!("stream chunk: {e}"))
            })?;
            let is_complete = body.is_complete;

            yield GenerationChunk {
                text: body.text,
                is_complete,
            };

            if is_complete {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_body_parses_sse_payload() {
        let body: StreamChunkBody =
            serde_json::from_str(r#"{"text":"Hel","is_complete":false}"#).unwrap();
        assert_eq!(body.text, "Hel");
        assert!(!body.is_complete);
    }

    #[test]
    fn test_terminal_chunk_payload() {
        let body: StreamChunkBody =
            serde_json::from_str(r#"{"text":"!","is_complete":true}"#).unwrap();
        assert!(body.is_complete);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let result = serde_json::from_str::<StreamChunkBody>("not json");
        assert!(result.is_err());
    }
}
