//! In-memory session store.
//!
//! Backs tests and single-process ephemeral deployments. Same observable
//! semantics as the SQLite adapter: idempotent create, ordered history,
//! clear-as-upsert.

use chatrelay_types::chat::{ChatMessage, ChatSession};
use chatrelay_types::error::StoreError;
use chrono::Utc;
use dashmap::DashMap;

use super::SessionStore;

/// Connection-keyed session map with no persistence across restarts.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, ChatSession>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    async fn create(&self, connection_id: &str, user_id: Option<&str>) -> Result<(), StoreError> {
        self.sessions
            .entry(connection_id.to_string())
            .or_insert_with(|| {
                ChatSession::new(connection_id, user_id.map(str::to_string))
            });
        Ok(())
    }

    async fn get(&self, connection_id: &str) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.sessions.get(connection_id).map(|s| s.clone()))
    }

    async fn append_message(
        &self,
        connection_id: &str,
        message: &ChatMessage,
    ) -> Result<(), StoreError> {
        let mut session = self
            .sessions
            .get_mut(connection_id)
            .ok_or(StoreError::NotFound)?;
        session.messages.push(message.clone());
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn clear(&self, connection_id: &str) -> Result<(), StoreError> {
        let mut session = self
            .sessions
            .entry(connection_id.to_string())
            .or_insert_with(|| ChatSession::new(connection_id, None));
        session.messages.clear();
        session.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_is_idempotent() {
        let store = InMemorySessionStore::new();
        store.create("c1", Some("u1")).await.unwrap();
        store
            .append_message("c1", &ChatMessage::user("hi"))
            .await
            .unwrap();
        // Second create must not wipe the existing history.
        store.create("c1", Some("u1")).await.unwrap();

        let session = store.get("c1").await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn get_missing_session_is_none() {
        let store = InMemorySessionStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_preserves_insertion_order() {
        let store = InMemorySessionStore::new();
        store.create("c1", None).await.unwrap();
        store
            .append_message("c1", &ChatMessage::user("one"))
            .await
            .unwrap();
        store
            .append_message("c1", &ChatMessage::assistant("two"))
            .await
            .unwrap();

        let session = store.get("c1").await.unwrap().unwrap();
        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
        assert!(session.updated_at >= session.created_at);
    }

    #[tokio::test]
    async fn append_to_missing_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store
            .append_message("nope", &ChatMessage::user("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn clear_empties_existing_session() {
        let store = InMemorySessionStore::new();
        store.create("c1", None).await.unwrap();
        store
            .append_message("c1", &ChatMessage::user("hi"))
            .await
            .unwrap();
        store.clear("c1").await.unwrap();

        let session = store.get("c1").await.unwrap().unwrap();
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn clear_on_missing_session_creates_it_empty() {
        let store = InMemorySessionStore::new();
        store.clear("fresh").await.unwrap();
        let session = store.get("fresh").await.unwrap().unwrap();
        assert!(session.messages.is_empty());
    }
}
