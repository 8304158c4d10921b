//! Outbound delivery port.

use chatrelay_types::error::DeliveryError;
use chatrelay_types::wire::ServerEnvelope;

/// Pushes serialized frames to one remote client connection.
///
/// The websocket registry in the transport layer is the production
/// implementation. Delivery is sequential per connection: the orchestrator
/// awaits each send before producing the next frame, so the client's read
/// pace backpressures generation.
pub trait DeliveryChannel: Send + Sync {
    /// Deliver one frame to the connection.
    ///
    /// `EndpointGone` means the connection no longer exists; the caller
    /// abandons the turn quietly since there is no one left to tell.
    fn send(
        &self,
        connection_id: &str,
        envelope: &ServerEnvelope,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}
