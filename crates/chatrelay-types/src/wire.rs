//! Client/server wire envelopes.
//!
//! Inbound frames are JSON objects `{ action, data? }`; malformed JSON is
//! treated as the default action with empty data rather than an error.
//! Outbound frames always carry `{ message, data: { ..., timestamp } }`
//! with a millisecond epoch timestamp stamped at construction.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Top-level `message` marker on incremental chunk frames.
pub const CHUNK_MARKER: &str = "stream_chunk";

/// Top-level `message` marker on final completion frames.
pub const COMPLETION_MARKER: &str = "chat_response";

/// Top-level `message` marker on error frames.
pub const ERROR_MARKER: &str = "error";

/// Acknowledgment text sent as soon as a generate turn is accepted.
pub const PROCESSING_ACK: &str = "Processing your request...";

/// Sender attributed to system notices and errors.
pub const SYSTEM_SENDER: &str = "System";

/// One inbound frame from a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub data: Option<ClientData>,
}

/// Payload of an inbound frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientData {
    pub message: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub sender: Option<String>,
}

/// Recognized inbound actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    /// Generate a reply (the primary path).
    Generate,
    /// Wipe the session history and start over.
    Clear,
    /// Anything else; answered with a generic acknowledgment.
    Other,
}

impl ClientEnvelope {
    /// Parse a raw text frame. Malformed JSON yields the default envelope
    /// (empty action, no data), which routes to the generic response path.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    /// Classify the action string.
    pub fn action(&self) -> ClientAction {
        match self.action.as_str() {
            "generate" => ClientAction::Generate,
            "clear" | "new_conversation" => ClientAction::Clear,
            _ => ClientAction::Other,
        }
    }

    /// The message text, if the payload carries one.
    pub fn message_text(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.message.as_deref())
    }

    /// The raw generation parameters object, if present.
    pub fn parameters(&self) -> Option<&serde_json::Value> {
        self.data.as_ref().and_then(|d| d.parameters.as_ref())
    }

    /// The client-declared display sender, if present.
    pub fn sender(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.sender.as_deref())
    }
}

/// User-facing failure category carried on error frames.
///
/// Matches the relay error taxonomy; classified once where the failure
/// occurs, never re-derived from message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed inbound message structure.
    Structural,
    /// The sanitizer rejected the input.
    InputRejected,
    /// The generation backend is unreachable.
    BackendConnection,
    /// Backend-reported overload, timeout, or resource exhaustion.
    BackendResource,
    /// Any other generation failure.
    BackendGeneric,
}

impl ErrorCategory {
    /// Default user-facing text for this category.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorCategory::Structural => "Invalid message format.",
            ErrorCategory::InputRejected => "Your message could not be accepted.",
            ErrorCategory::BackendConnection => {
                "The generation service is unavailable. Please try again."
            }
            ErrorCategory::BackendResource => {
                "The generation service is overloaded. Try a shorter message or wait a moment."
            }
            ErrorCategory::BackendGeneric => "Generation failed. Please try again.",
        }
    }
}

/// One outbound frame to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEnvelope {
    pub message: String,
    pub data: ServerPayload,
}

/// Payload of an outbound frame. Optional fields are omitted from the wire
/// when unset; `timestamp` (epoch milliseconds) is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "isComplete", skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub timestamp: i64,
}

impl ServerPayload {
    fn stamped() -> Self {
        Self {
            text: None,
            message: None,
            is_complete: None,
            sender: None,
            error: None,
            category: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

impl ServerEnvelope {
    /// Immediate "processing" acknowledgment for an accepted generate turn.
    pub fn processing_ack() -> Self {
        Self {
            message: PROCESSING_ACK.to_string(),
            data: ServerPayload::stamped(),
        }
    }

    /// One incremental generation chunk.
    pub fn chunk(text: impl Into<String>, is_complete: bool) -> Self {
        Self {
            message: CHUNK_MARKER.to_string(),
            data: ServerPayload {
                text: Some(text.into()),
                is_complete: Some(is_complete),
                ..ServerPayload::stamped()
            },
        }
    }

    /// Final completion frame carrying the full generated text.
    pub fn completion(full_text: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            message: COMPLETION_MARKER.to_string(),
            data: ServerPayload {
                message: Some(full_text.into()),
                sender: Some(sender.into()),
                is_complete: Some(true),
                ..ServerPayload::stamped()
            },
        }
    }

    /// System notice (cleared history, connected, generic acknowledgment).
    pub fn system(notice: impl Into<String>) -> Self {
        Self {
            message: notice.into(),
            data: ServerPayload {
                sender: Some(SYSTEM_SENDER.to_string()),
                ..ServerPayload::stamped()
            },
        }
    }

    /// Error frame tagged with its failure category.
    pub fn error(category: ErrorCategory, text: impl Into<String>) -> Self {
        Self {
            message: ERROR_MARKER.to_string(),
            data: ServerPayload {
                message: Some(text.into()),
                sender: Some(SYSTEM_SENDER.to_string()),
                error: Some(true),
                category: Some(category),
                ..ServerPayload::stamped()
            },
        }
    }
}
