//! Generation backend request/response types.
//!
//! These model the data shapes exchanged with the streaming text-generation
//! backend: bounded sampling parameters, the assembled prompt, incremental
//! chunks, and the backend error taxonomy.

use serde::{Deserialize, Serialize};

/// Bounded sampling parameters for a generation call.
///
/// Always usable: [`crate::config::ParameterBounds`] clamping in the
/// sanitizer guarantees every field is within its configured range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

/// Request to the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub parameters: GenerationParameters,
}

/// One incremental fragment of a streamed generation response.
///
/// Chunks must be observed in the order the backend produced them;
/// `is_complete = true` marks the terminal chunk of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationChunk {
    pub text: String,
    pub is_complete: bool,
}

/// Errors from generation backend operations.
///
/// Classified once at the boundary where the backend call fails; callers
/// match on variants, never on message substrings.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Connection establishment failed after exhausting the retry ceiling.
    #[error("backend connection failed after {attempts} attempts: {message}")]
    ConnectFailed { attempts: u32, message: String },

    /// The backend is reachable but refusing work (transient).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A per-call deadline elapsed before the backend answered.
    #[error("generation deadline exceeded")]
    DeadlineExceeded,

    /// Backend-reported overload or resource exhaustion.
    #[error("backend overloaded: {0}")]
    Overloaded(String),

    /// The stream broke mid-response.
    #[error("stream error: {0}")]
    Stream(String),

    /// The backend returned a malformed payload.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Any other backend-reported failure.
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl GenerationError {
    /// Whether the call-level retry policy may retry this failure.
    ///
    /// Only steady-state transient categories qualify; connection
    /// establishment has its own independent retry loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Unavailable(_) | GenerationError::DeadlineExceeded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::Unavailable("503".into()).is_transient());
        assert!(GenerationError::DeadlineExceeded.is_transient());

        assert!(!GenerationError::ConnectFailed {
            attempts: 3,
            message: "refused".into()
        }
        .is_transient());
        assert!(!GenerationError::Overloaded("oom".into()).is_transient());
        assert!(!GenerationError::Stream("eof".into()).is_transient());
        assert!(!GenerationError::Backend {
            message: "boom".into()
        }
        .is_transient());
    }

    #[test]
    fn test_chunk_serde_snake_case() {
        let chunk = GenerationChunk {
            text: "Hel".into(),
            is_complete: false,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        assert_eq!(json, r#"{"text":"Hel","is_complete":false}"#);
    }

    #[test]
    fn test_parameters_skip_empty_stops() {
        let params = GenerationParameters {
            temperature: 0.7,
            max_tokens: 512,
            top_p: 0.9,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stop_sequences: Vec::new(),
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("stop_sequences"));
    }
}
