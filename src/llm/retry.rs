//! Exponential backoff retry and per-call timeout for model calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

use crate::error::AnalyzerError;

/// Ceiling for a single backoff sleep.
const MAX_INTERVAL_SECS: u64 = 30;

/// How many times a call is attempted and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait after the first failure; doubles after each further failure.
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.reset();
        backoff
    }
}

/// Retry an async operation with exponential backoff.
///
/// `attempt` receives the zero-based attempt number. After a failure the task
/// sleeps `base_delay * 2^attempt` before trying again. The last error is
/// returned unchanged once attempts run out, so callers can still match on it.
pub async fn retry_with_backoff<T, E, Fut, F>(policy: RetryPolicy, mut attempt: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempts = 0;

    loop {
        match attempt(attempts).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempts += 1;
                if attempts >= max_attempts {
                    warn!("All {} attempts failed. Last error: {}", max_attempts, e);
                    return Err(e);
                }

                warn!("Attempt {}/{} failed: {}", attempts, max_attempts, e);
                if let Some(wait) = backoff.next_backoff() {
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Race a model call against a timer; the timer winning is [`AnalyzerError::LlmTimeout`].
pub async fn with_timeout<T, Fut>(limit: Duration, call: Fut) -> Result<T, AnalyzerError>
where
    Fut: Future<Output = Result<T, AnalyzerError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| AnalyzerError::LlmTimeout {
            timeout_ms: limit.as_millis() as u64,
        })?
}
