//! Relay configuration schema.
//!
//! Deserialized from `{data_dir}/config.toml` by the infra loader. Every
//! field has a serde default so a partial file (or no file at all) still
//! yields a usable configuration.

use serde::{Deserialize, Serialize};

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
    #[serde(default)]
    pub parameters: ParameterBounds,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Input sanitization limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Maximum accepted message length in characters. Longer input is
    /// truncated to this length and marked invalid.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Maximum number of stop sequences accepted from a client.
    #[serde(default = "default_max_stop_sequences")]
    pub max_stop_sequences: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
            max_stop_sequences: default_max_stop_sequences(),
        }
    }
}

fn default_max_message_len() -> usize {
    4_000
}

fn default_max_stop_sequences() -> usize {
    4
}

/// Floors, ceilings, and fallback defaults for generation parameters.
///
/// Parameter sanitization clamps every numeric field into
/// `[floor, ceiling]` and substitutes the default for missing or
/// non-numeric values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterBounds {
    #[serde(default = "default_temperature_floor")]
    pub temperature_floor: f64,
    #[serde(default = "default_temperature_ceiling")]
    pub temperature_ceiling: f64,
    #[serde(default = "default_temperature")]
    pub temperature_default: f64,

    #[serde(default = "default_max_tokens_floor")]
    pub max_tokens_floor: u32,
    #[serde(default = "default_max_tokens_ceiling")]
    pub max_tokens_ceiling: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens_default: u32,

    #[serde(default = "default_top_p_floor")]
    pub top_p_floor: f64,
    #[serde(default = "default_top_p_ceiling")]
    pub top_p_ceiling: f64,
    #[serde(default = "default_top_p")]
    pub top_p_default: f64,

    #[serde(default = "default_penalty_floor")]
    pub penalty_floor: f64,
    #[serde(default = "default_penalty_ceiling")]
    pub penalty_ceiling: f64,
    #[serde(default = "default_penalty")]
    pub penalty_default: f64,
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            temperature_floor: default_temperature_floor(),
            temperature_ceiling: default_temperature_ceiling(),
            temperature_default: default_temperature(),
            max_tokens_floor: default_max_tokens_floor(),
            max_tokens_ceiling: default_max_tokens_ceiling(),
            max_tokens_default: default_max_tokens(),
            top_p_floor: default_top_p_floor(),
            top_p_ceiling: default_top_p_ceiling(),
            top_p_default: default_top_p(),
            penalty_floor: default_penalty_floor(),
            penalty_ceiling: default_penalty_ceiling(),
            penalty_default: default_penalty(),
        }
    }
}

fn default_temperature_floor() -> f64 {
    0.0
}

fn default_temperature_ceiling() -> f64 {
    2.0
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens_floor() -> u32 {
    1
}

fn default_max_tokens_ceiling() -> u32 {
    2_048
}

fn default_max_tokens() -> u32 {
    512
}

fn default_top_p_floor() -> f64 {
    0.0
}

fn default_top_p_ceiling() -> f64 {
    1.0
}

fn default_top_p() -> f64 {
    0.9
}

fn default_penalty_floor() -> f64 {
    -2.0
}

fn default_penalty_ceiling() -> f64 {
    2.0
}

fn default_penalty() -> f64 {
    0.0
}

/// Prompt assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Total prompt slots. The most recent `history_window - 1` stored
    /// messages are rendered; one slot is reserved for the new turn.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

fn default_history_window() -> usize {
    50
}

/// Generation backend endpoint and retry policies.
///
/// The two retry blocks guard different failure classes and are never
/// merged: `connect_*` covers one-time connection establishment, `retry`
/// covers steady-state transient call failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Static backend endpoint, used directly or as the discovery fallback.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Optional discovery URL returning `{"endpoint": "..."}`. Discovery
    /// failure falls back to the static endpoint.
    #[serde(default)]
    pub discovery_url: Option<String>,

    /// Deadline for a single connection-establishment probe.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Connection-establishment attempt ceiling.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Fixed delay between connection-establishment attempts.
    #[serde(default = "default_connect_retry_delay_ms")]
    pub connect_retry_delay_ms: u64,

    /// End-to-end deadline for one generation call. Much longer than the
    /// connect deadline: generations can run for minutes.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub retry: CallRetryConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            discovery_url: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            connect_attempts: default_connect_attempts(),
            connect_retry_delay_ms: default_connect_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: CallRetryConfig::default(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8091".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_connect_retry_delay_ms() -> u64 {
    2_000
}

fn default_request_timeout_ms() -> u64 {
    300_000
}

/// Call-level retry policy for transient backend failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRetryConfig {
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for CallRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    8_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = RelayConfig::default();
        assert_eq!(config.sanitizer.max_message_len, 4_000);
        assert_eq!(config.prompt.history_window, 50);
        assert_eq!(config.backend.connect_attempts, 3);
        assert_eq!(config.backend.retry.max_attempts, 3);
        assert!(config.backend.request_timeout_ms > config.backend.connect_timeout_ms);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_src = r#"
[sanitizer]
max_message_len = 100

[backend]
endpoint = "http://gen.internal:9000"
"#;
        let config: RelayConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.sanitizer.max_message_len, 100);
        assert_eq!(config.sanitizer.max_stop_sequences, 4);
        assert_eq!(config.backend.endpoint, "http://gen.internal:9000");
        assert_eq!(config.backend.connect_timeout_ms, 5_000);
        assert_eq!(config.prompt.history_window, 50);
    }

    #[test]
    fn test_empty_toml_is_fully_defaulted() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert!((config.parameters.temperature_ceiling - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.parameters.max_tokens_default, 512);
        assert!(config.backend.discovery_url.is_none());
    }
}
