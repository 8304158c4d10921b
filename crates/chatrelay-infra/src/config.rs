//! Relay configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.chatrelay/` in
//! production, overridable via `CHATRELAY_DATA_DIR`) and deserializes it
//! into [`RelayConfig`]. Falls back to defaults when the file is missing
//! or malformed.

use std::path::{Path, PathBuf};

use chatrelay_types::config::RelayConfig;

/// Resolve the data directory from `CHATRELAY_DATA_DIR`, falling back to
/// `~/.chatrelay`.
pub fn data_dir() -> PathBuf {
    match std::env::var("CHATRELAY_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".chatrelay")
        }
    }
}

/// Load relay configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`RelayConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the
///   default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_relay_config(data_dir: &Path) -> RelayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RelayConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_relay_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_relay_config(tmp.path()).await;
        assert_eq!(config.sanitizer.max_message_len, 4_000);
        assert_eq!(config.backend.endpoint, "http://127.0.0.1:8091");
    }

    #[tokio::test]
    async fn load_relay_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
[prompt]
history_window = 20

[backend]
endpoint = "http://gen.internal:9000"
discovery_url = "http://discovery.internal/generation"
"#,
        )
        .await
        .unwrap();

        let config = load_relay_config(tmp.path()).await;
        assert_eq!(config.prompt.history_window, 20);
        assert_eq!(config.backend.endpoint, "http://gen.internal:9000");
        assert_eq!(
            config.backend.discovery_url.as_deref(),
            Some("http://discovery.internal/generation")
        );
        // Untouched sections keep defaults.
        assert_eq!(config.backend.retry.max_attempts, 3);
    }

    #[tokio::test]
    async fn load_relay_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_relay_config(tmp.path()).await;
        assert_eq!(config.sanitizer.max_message_len, 4_000);
    }
}
