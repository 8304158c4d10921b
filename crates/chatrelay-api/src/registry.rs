//! Live WebSocket connection registry.
//!
//! Maps connection identifiers to their outbound frame senders and
//! metadata. Implements both `DeliveryChannel` (pushing serialized
//! envelopes to a connection's writer task) and `ConnectionDirectory`
//! (metadata lookup) for the relay service.
//!
//! Each connection's sender is a bounded channel: when the writer task
//! falls behind, `send` waits, which is what backpressures chunk
//! production in the relay.

use axum::extract::ws::Message;
use chatrelay_core::connection::{ConnectionDirectory, ConnectionRecord};
use chatrelay_core::delivery::DeliveryChannel;
use chatrelay_types::error::DeliveryError;
use chatrelay_types::wire::ServerEnvelope;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// Outbound frame queue depth per connection.
pub const OUTBOUND_BUFFER: usize = 32;

struct ConnectionEntry {
    sender: mpsc::Sender<Message>,
    record: ConnectionRecord,
}

/// In-process registry of live connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection with its writer-side sender.
    pub fn register(&self, record: ConnectionRecord, sender: mpsc::Sender<Message>) {
        self.connections
            .insert(record.connection_id.clone(), ConnectionEntry { sender, record });
    }

    /// Drop a connection on teardown. Safe to call twice.
    pub fn unregister(&self, connection_id: &str) {
        self.connections.remove(connection_id);
    }

    /// Number of currently registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl DeliveryChannel for ConnectionRegistry {
    async fn send(
        &self,
        connection_id: &str,
        envelope: &ServerEnvelope,
    ) -> Result<(), DeliveryError> {
        // Clone the sender out so no map guard is held across the await.
        let sender = match self.connections.get(connection_id) {
            Some(entry) => entry.sender.clone(),
            None => return Err(DeliveryError::EndpointGone),
        };

        let json = serde_json::to_string(envelope)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        // A closed receiver means the writer task is gone with the socket.
        sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| DeliveryError::EndpointGone)
    }
}

impl ConnectionDirectory for ConnectionRegistry {
    fn lookup(&self, connection_id: &str) -> Option<ConnectionRecord> {
        self.connections
            .get(connection_id)
            .map(|entry| entry.record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(connection_id: &str) -> ConnectionRecord {
        ConnectionRecord {
            connection_id: connection_id.to_string(),
            user_id: Some("user-1".to_string()),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn send_reaches_registered_connection() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(OUTBOUND_BUFFER);
        registry.register(record("c1"), tx);

        registry
            .send("c1", &ServerEnvelope::system("hello"))
            .await
            .unwrap();

        let message = rx.recv().await.unwrap();
        let Message::Text(text) = message else {
            panic!("expected a text frame");
        };
        assert!(text.contains("hello"));
    }

    #[tokio::test]
    async fn send_to_unknown_connection_is_endpoint_gone() {
        let registry = ConnectionRegistry::new();
        let err = registry
            .send("nope", &ServerEnvelope::system("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::EndpointGone));
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_is_endpoint_gone() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        registry.register(record("c1"), tx);
        drop(rx);

        let err = registry
            .send("c1", &ServerEnvelope::system("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::EndpointGone));
    }

    #[tokio::test]
    async fn lookup_returns_record_until_unregistered() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(OUTBOUND_BUFFER);
        registry.register(record("c1"), tx);

        let found = registry.lookup("c1").unwrap();
        assert_eq!(found.user_id.as_deref(), Some("user-1"));
        assert_eq!(registry.len(), 1);

        registry.unregister("c1");
        assert!(registry.lookup("c1").is_none());
        assert!(registry.is_empty());
    }
}
