//! SQLite session store implementation.
//!
//! Implements `SessionStore` from `chatrelay-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reads on the reader
//! pool, mutations serialized through the single-connection writer pool.
//! Per-key atomicity for appends comes from the writer transaction plus the
//! single writer connection.

use chatrelay_core::session::SessionStore;
use chatrelay_types::chat::{ChatMessage, ChatRole, ChatSession};
use chatrelay_types::error::StoreError;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionStore`.
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatSessionRow {
    connection_id: String,
    user_id: Option<String>,
    created_at: String,
    updated_at: String,
    expires_at: Option<String>,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            connection_id: row.try_get("connection_id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }

    fn into_session(self, messages: Vec<ChatMessage>) -> Result<ChatSession, StoreError> {
        Ok(ChatSession {
            connection_id: self.connection_id,
            user_id: self.user_id,
            messages,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            expires_at: self.expires_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

struct ChatMessageRow {
    id: String,
    role: String,
    content: String,
    created_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Query(format!("invalid message id: {e}")))?;
        let role: ChatRole = self
            .role
            .parse()
            .map_err(|e: String| StoreError::Query(e))?;

        Ok(ChatMessage {
            id,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn query_err(e: sqlx::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// SessionStore implementation
// ---------------------------------------------------------------------------

impl SessionStore for SqliteSessionStore {
    async fn create(&self, connection_id: &str, user_id: Option<&str>) -> Result<(), StoreError> {
        let now = format_datetime(&Utc::now());
        // INSERT OR IGNORE keeps create idempotent: reconnect storms racing
        // on the same key leave the first session intact.
        sqlx::query(
            "INSERT OR IGNORE INTO chat_sessions (connection_id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(connection_id)
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn get(&self, connection_id: &str) -> Result<Option<ChatSession>, StoreError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE connection_id = ?")
            .bind(connection_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let session_row = ChatSessionRow::from_row(&row).map_err(query_err)?;

        let rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE connection_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(connection_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row = ChatMessageRow::from_row(row).map_err(query_err)?;
            messages.push(msg_row.into_message()?);
        }

        Ok(Some(session_row.into_session(messages)?))
    }

    async fn append_message(
        &self,
        connection_id: &str,
        message: &ChatMessage,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        // Bumping updated_at doubles as the existence check.
        let updated = sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE connection_id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(connection_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            "INSERT INTO chat_messages (id, connection_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(connection_id)
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn clear(&self, connection_id: &str) -> Result<(), StoreError> {
        let now = format_datetime(&Utc::now());
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        // Upsert so clearing a never-seen connection still leaves an empty
        // session behind for subsequent gets.
        sqlx::query(
            "INSERT OR IGNORE INTO chat_sessions (connection_id, user_id, created_at, updated_at) VALUES (?, NULL, ?, ?)",
        )
        .bind(connection_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        sqlx::query("DELETE FROM chat_messages WHERE connection_id = ?")
            .bind(connection_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE connection_id = ?")
            .bind(&now)
            .bind(connection_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteSessionStore {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        SqliteSessionStore::new(DatabasePool::new(&url).await.unwrap())
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let store = test_store().await;

        store.create("conn-1", Some("user-1")).await.unwrap();

        let session = store.get("conn-1").await.unwrap().unwrap();
        assert_eq!(session.connection_id, "conn-1");
        assert_eq!(session.user_id.as_deref(), Some("user-1"));
        assert!(session.messages.is_empty());
        assert!(session.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = test_store().await;

        store.create("conn-1", Some("user-1")).await.unwrap();
        store
            .append_message("conn-1", &ChatMessage::user("hello"))
            .await
            .unwrap();
        // Second create must not wipe history or change ownership.
        store.create("conn-1", Some("user-2")).await.unwrap();

        let session = store.get("conn-1").await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.user_id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_get_missing_session_is_none() {
        let store = test_store().await;
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_preserves_order_and_roles() {
        let store = test_store().await;
        store.create("conn-1", None).await.unwrap();

        store
            .append_message("conn-1", &ChatMessage::user("first"))
            .await
            .unwrap();
        store
            .append_message("conn-1", &ChatMessage::assistant("second"))
            .await
            .unwrap();
        store
            .append_message("conn-1", &ChatMessage::user("third"))
            .await
            .unwrap();

        let session = store.get("conn-1").await.unwrap().unwrap();
        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(session.messages[0].role, ChatRole::User);
        assert_eq!(session.messages[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_append_to_missing_session_is_not_found() {
        let store = test_store().await;
        let err = store
            .append_message("nope", &ChatMessage::user("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_clear_empties_session_but_keeps_it() {
        let store = test_store().await;
        store.create("conn-1", Some("user-1")).await.unwrap();
        store
            .append_message("conn-1", &ChatMessage::user("hello"))
            .await
            .unwrap();

        store.clear("conn-1").await.unwrap();

        let session = store.get("conn-1").await.unwrap().unwrap();
        assert!(session.messages.is_empty());
        assert_eq!(session.user_id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_clear_unknown_connection_creates_empty_session() {
        let store = test_store().await;

        store.clear("fresh").await.unwrap();

        let session = store.get("fresh").await.unwrap().unwrap();
        assert!(session.messages.is_empty());
        assert!(session.user_id.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_by_connection() {
        let store = test_store().await;
        store.create("conn-1", None).await.unwrap();
        store.create("conn-2", None).await.unwrap();
        store
            .append_message("conn-1", &ChatMessage::user("only for one"))
            .await
            .unwrap();

        store.clear("conn-2").await.unwrap();

        let session = store.get("conn-1").await.unwrap().unwrap();
        assert_eq!(session.messages.len(), 1);
    }
}
