//! Chat session and message types for chatrelay.
//!
//! A session is the durable conversation history for one live client
//! connection. The connection identifier is the session's natural key:
//! a new connection always gets a fresh session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Role of a message within a conversation.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(format!("invalid chat role: '{other}'")),
        }
    }
}

/// A single message within a chat session.
///
/// Immutable once appended. Timestamps are monotonically non-decreasing
/// within a session and are used only for ordering and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a user message stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Create an assistant message stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// The durable, connection-keyed conversation history.
///
/// The message sequence is append-only except for an explicit clear, which
/// atomically replaces it with the empty sequence. Insertion order is the
/// authoritative conversation order. Sessions are created lazily on the
/// first inbound turn for a connection and never deleted by the relay core
/// (teardown belongs to the transport layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Connection identifier this session belongs to (natural key).
    pub connection_id: String,
    /// Owning user, when the transport resolved one.
    pub user_id: Option<String>,
    /// Ordered message sequence; insertion order = conversation order.
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    /// Create an empty session for a connection.
    pub fn new(connection_id: impl Into<String>, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            connection_id: connection_id.into(),
            user_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_roundtrip() {
        for role in [ChatRole::User, ChatRole::Assistant] {
            let s = role.to_string();
            let parsed: ChatRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_chat_role_serde() {
        let json = serde_json::to_string(&ChatRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: ChatRole = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ChatRole::Assistant);
    }

    #[test]
    fn test_chat_role_rejects_unknown() {
        assert!("system".parse::<ChatRole>().is_err());
    }

    #[test]
    fn test_message_constructors_set_role() {
        let user = ChatMessage::user("hi");
        assert_eq!(user.role, ChatRole::User);
        let assistant = ChatMessage::assistant("hello");
        assert_eq!(assistant.role, ChatRole::Assistant);
        assert!(user.created_at <= assistant.created_at);
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = ChatSession::new("conn-1", Some("user-1".into()));
        assert_eq!(session.connection_id, "conn-1");
        assert!(session.messages.is_empty());
        assert_eq!(session.created_at, session.updated_at);
    }
}
