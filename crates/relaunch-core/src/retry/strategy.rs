//! The retry strategy abstraction.

use super::scheduler::RetryState;
use async_trait::async_trait;
use std::error::Error;
use std::future::Future;
use std::time::Duration;

/// A strategy for retrying failed operations with backoff.
///
/// Implementations decide whether to retry, how long to wait between
/// attempts and when to give up.
///
/// # Examples
///
/// ```rust
/// use relaunch_core::config::RetryConfig;
/// use relaunch_core::retry::{BackoffStrategy, RetryExecutor};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = RetryExecutor::new(
///     RetryConfig::builder()
///         .max_attempts(3)
///         .initial_delay(Duration::from_millis(100))
///         .build(),
/// );
///
/// let value = executor.execute(|| async {
///     Ok::<_, std::io::Error>(42)
/// }).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait BackoffStrategy: Send + Sync {
    /// Execute an operation with retry logic.
    ///
    /// The operation is invoked until it succeeds, a non-retryable error
    /// occurs, or [`max_attempts`](Self::max_attempts) invocations have
    /// failed. An operation that fails before yielding (an immediately-ready
    /// `Err`) is handled exactly like one that fails asynchronously.
    ///
    /// # Returns
    /// - `Ok(T)`: the value of the successful attempt, unchanged
    /// - `Err(E)`: the error of the last attempt, unchanged
    async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Error + Send + Sync + 'static;

    /// Determine if an error is retryable.
    ///
    /// `attempt` is the 1-based number of the attempt that failed. The default
    /// retries everything.
    fn should_retry(&self, error: &dyn Error, attempt: u32) -> bool {
        let _ = (error, attempt);
        true
    }

    /// Select the delay before the next attempt and advance `state`.
    fn next_delay(&self, state: &mut RetryState) -> Duration;

    /// Total number of attempts, the first one included. Always at least 1.
    fn max_attempts(&self) -> u32;
}
