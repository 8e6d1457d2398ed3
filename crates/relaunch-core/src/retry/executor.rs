//! Retry executor driven by a [`RetryConfig`].

use super::scheduler::RetryState;
use super::strategy::BackoffStrategy;
use crate::config::RetryConfig;
use async_trait::async_trait;
use std::error::Error;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Executes operations with exponential backoff as configured by a
/// [`RetryConfig`].
///
/// Each call to [`execute`](BackoffStrategy::execute) moves through:
///
/// ```text
/// Attempting ──ok──► Succeeded
///     │
///    err
///     ▼
/// CheckRetry ──attempt >= max_attempts or !should_retry──► Exhausted
///     │
///     ▼
///  Waiting ──delay elapsed──► Attempting
/// ```
///
/// Attempts never overlap: attempt N+1 starts only after attempt N has
/// failed and its delay has fully elapsed. There is no cancellation hook;
/// a call runs until it succeeds or is exhausted.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create an executor for `config`.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The configuration driving this executor.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl BackoffStrategy for RetryExecutor {
    async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Error + Send + Sync + 'static,
    {
        let max_attempts = self.max_attempts();
        let mut state = RetryState::new(&self.config);

        loop {
            let attempt = state.begin_attempt();
            debug!(attempt, max_attempts, "starting attempt");

            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if attempt >= max_attempts {
                debug!(attempt, error = %err, "retry attempts exhausted");
                return Err(err);
            }
            if !self.should_retry(&err, attempt) {
                debug!(attempt, error = %err, "error is not retryable");
                return Err(err);
            }

            let delay = self.next_delay(&mut state);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn should_retry(&self, error: &dyn Error, _attempt: u32) -> bool {
        self.config.should_retry.test(error)
    }

    fn next_delay(&self, state: &mut RetryState) -> Duration {
        state.next_delay(&self.config)
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }
}

/// Run `operation` until it succeeds or `config` stops retrying it.
///
/// The successful value, or the last error, is returned unchanged.
///
/// # Examples
///
/// ```rust
/// use relaunch_core::config::RetryConfig;
/// use relaunch_core::retry::retry_with_backoff;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), std::io::Error> {
/// let config = RetryConfig::builder()
///     .initial_delay(Duration::from_millis(10))
///     .build();
///
/// let calls = AtomicU32::new(0);
/// let value = retry_with_backoff(|| {
///     let n = calls.fetch_add(1, Ordering::SeqCst);
///     async move {
///         if n == 0 { Err(std::io::Error::other("connection reset")) } else { Ok(n) }
///     }
/// }, &config).await?;
/// assert_eq!(value, 1);
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Error + Send + Sync + 'static,
{
    RetryExecutor::new(config.clone()).execute(operation).await
}
