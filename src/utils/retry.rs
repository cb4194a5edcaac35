//! Bounded retry with a fixed inter-attempt delay.

use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::RetrySettings;
use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            delay: Duration::from_millis(settings.delay_ms),
            attempt_timeout: Duration::from_secs(settings.attempt_timeout_secs.max(1)),
        }
    }
}

/// Execute an async operation with retry logic
///
/// Transient errors (see [`SourceError::is_transient`]) and attempt timeouts
/// are retried up to `max_attempts`, sleeping `delay` in between. Permanent
/// errors are returned immediately.
pub async fn with_retry<T, F, Fut>(
    config: RetryConfig,
    what: &str,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match timeout(config.attempt_timeout, operation()).await {
            Ok(Ok(result)) => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}", what, attempt);
                }
                return Ok(result);
            }
            Ok(Err(error)) if !error.is_transient() => return Err(error),
            Ok(Err(error)) => error,
            Err(_) => SourceError::Timeout(format!(
                "{} exceeded {:?}",
                what, config.attempt_timeout
            )),
        };

        if attempt >= max_attempts {
            tracing::warn!("{} failed after {} attempts: {}", what, attempt, error);
            return Err(error);
        }

        tracing::debug!(
            "{} failed on attempt {}/{}: {}, retrying in {:?}",
            what,
            attempt,
            max_attempts,
            error,
            config.delay
        );
        sleep(config.delay).await;
    }
}
