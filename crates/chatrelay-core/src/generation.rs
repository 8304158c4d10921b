//! Generation backend port.

use chatrelay_types::generation::{GenerationChunk, GenerationError, GenerationRequest};
use futures_util::Stream;

use std::pin::Pin;

/// Pull-based stream of generation chunks.
///
/// Consumers drain it at their own pace; an unread chunk exerts
/// backpressure on the producer instead of piling up in a queue. The first
/// `Err` item is terminal: implementations stop yielding after it.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerationChunk, GenerationError>> + Send + 'static>>;

/// Streaming text-generation backend.
///
/// The HTTP client in `chatrelay-infra` is the production implementation.
/// Errors surface through the closed [`GenerationError`] taxonomy, already
/// classified; callers never inspect message text.
pub trait GenerationBackend: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Single-shot generation returning the full completion at once.
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;

    /// Streaming generation.
    ///
    /// Establishment failures (connect, discovery, handshake) are returned
    /// as the outer `Err`; failures after the stream is established arrive
    /// as an `Err` item within the stream and are never retried.
    fn stream(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<ChunkStream, GenerationError>> + Send;
}
