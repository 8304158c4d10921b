//! Session store port.

use chatrelay_types::chat::{ChatMessage, ChatSession};
use chatrelay_types::error::StoreError;

/// Durable, connection-keyed conversation storage.
///
/// The relay orchestrator is generic over this trait; the SQLite adapter
/// in `chatrelay-infra` is the production implementation and
/// [`super::InMemorySessionStore`] backs tests and ephemeral deployments.
///
/// Implementations must preserve insertion order as conversation order and
/// make `append_message` atomic with the session's `updated_at` bump.
pub trait SessionStore: Send + Sync {
    /// Create an empty session for a connection. Idempotent: if the
    /// session already exists this is a no-op, never an error.
    fn create(
        &self,
        connection_id: &str,
        user_id: Option<&str>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch the full session with its ordered messages. `None` when no
    /// session exists for the connection.
    fn get(
        &self,
        connection_id: &str,
    ) -> impl Future<Output = Result<Option<ChatSession>, StoreError>> + Send;

    /// Append one message to the session, returning `NotFound` when the
    /// session does not exist.
    fn append_message(
        &self,
        connection_id: &str,
        message: &ChatMessage,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically replace the session's messages with the empty sequence.
    ///
    /// Clearing a session that does not exist yet creates it empty, so a
    /// subsequent `get` observes an empty session rather than absence.
    fn clear(&self, connection_id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}
