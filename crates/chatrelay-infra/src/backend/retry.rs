//! Call-level retry with exponential backoff.
//!
//! This policy covers steady-state transient failures of individual
//! generation calls. It is independent of the fixed-delay retry loop used
//! for one-time connection establishment in the client; the two guard
//! different failure classes and are configured separately.

use chatrelay_types::config::CallRetryConfig;
use chatrelay_types::generation::GenerationError;
use tracing::debug;

use std::time::Duration;

/// Backoff delay before retry number `attempt` (1-based), doubling from
/// the base and capped at the configured maximum.
fn backoff_delay(config: &CallRetryConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let delay_ms = config
        .base_delay_ms
        .saturating_mul(1u64 << exp)
        .min(config.max_delay_ms);
    Duration::from_millis(delay_ms)
}

/// Run `operation` with up to `config.max_attempts` attempts.
///
/// Only failures marked transient by [`GenerationError::is_transient`] are
/// retried; everything else returns immediately. The last error is
/// returned unchanged after the attempt ceiling.
pub async fn retry_transient<T, F, Fut>(
    config: &CallRetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = backoff_delay(config, attempt);
                debug!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %err,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> CallRetryConfig {
        CallRetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = CallRetryConfig {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        };
        assert_eq!(backoff_delay(&config, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(&config, 2), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(&config, 3), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(&config, 10), Duration::from_millis(8_000));
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_config(5), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GenerationError::Unavailable("503".into()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&fast_config(5), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(GenerationError::Backend {
                    message: "boom".into(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(GenerationError::Backend { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_after_attempt_ceiling() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&fast_config(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GenerationError::DeadlineExceeded) }
        })
        .await;
        assert!(matches!(result, Err(GenerationError::DeadlineExceeded)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
