//! Wire types for the generation backend HTTP API.

use chatrelay_types::generation::{GenerationParameters, GenerationRequest};
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/generate` and `POST /v1/generate/stream`.
#[derive(Debug, Serialize)]
pub struct GenerateRequestBody {
    pub prompt: String,
    pub parameters: ParametersBody,
}

#[derive(Debug, Serialize)]
pub struct ParametersBody {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl From<GenerationParameters> for ParametersBody {
    fn from(p: GenerationParameters) -> Self {
        Self {
            temperature: p.temperature,
            max_tokens: p.max_tokens,
            top_p: p.top_p,
            presence_penalty: p.presence_penalty,
            frequency_penalty: p.frequency_penalty,
            stop_sequences: p.stop_sequences,
        }
    }
}

impl From<GenerationRequest> for GenerateRequestBody {
    fn from(r: GenerationRequest) -> Self {
        Self {
            prompt: r.prompt,
            parameters: r.parameters.into(),
        }
    }
}

/// Response of the unary `POST /v1/generate` call.
#[derive(Debug, Deserialize)]
pub struct GenerateResponseBody {
    pub text: String,
}

/// One SSE data payload from `POST /v1/generate/stream`.
#[derive(Debug, Deserialize)]
pub struct StreamChunkBody {
    pub text: String,
    #[serde(default)]
    pub is_complete: bool,
}

/// Response of the optional discovery lookup.
#[derive(Debug, Deserialize)]
pub struct DiscoveryResponse {
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = GenerationRequest {
            prompt: "Human: hi\n\nAssistant:".to_string(),
            parameters: GenerationParameters {
                temperature: 0.7,
                max_tokens: 512,
                top_p: 0.9,
                presence_penalty: 0.0,
                frequency_penalty: 0.0,
                stop_sequences: Vec::new(),
            },
        };
        let body: GenerateRequestBody = request.into();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["prompt"], "Human: hi\n\nAssistant:");
        assert_eq!(json["parameters"]["max_tokens"], 512);
        assert!(json["parameters"].get("stop_sequences").is_none());
    }

    #[test]
    fn test_stream_chunk_defaults_incomplete() {
        let chunk: StreamChunkBody = serde_json::from_str(r#"{"text":"Hel"}"#).unwrap();
        assert_eq!(chunk.text, "Hel");
        assert!(!chunk.is_complete);
    }

    #[test]
    fn test_discovery_response_parses() {
        let resp: DiscoveryResponse =
            serde_json::from_str(r#"{"endpoint":"http://gen:9000"}"#).unwrap();
        assert_eq!(resp.endpoint, "http://gen:9000");
    }
}
