#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry-with-backoff engine for fallible asynchronous operations.
//!
//! This crate drives an operation through repeated attempts until it succeeds
//! or the attempt budget is exhausted:
//!
//! - **Backoff scheduling** via [`RetryState`](retry::RetryState)
//!   - Exponential growth, capped at selection time
//!   - Optional jitter of up to 30% of the capped delay
//! - **Error classification** via [`ErrorClassifier`](error::ErrorClassifier)
//!   - Permanent markers (`401`, `invalid`, ...) veto retries
//!   - Transient markers (`timeout`, `503`, ...) allow them
//! - **Retry execution** via [`retry_with_backoff`](retry::retry_with_backoff)
//!   and the [`BackoffStrategy`](retry::BackoffStrategy) trait
//! - **Configuration** via [`RetryConfig`](config::RetryConfig) and the
//!   serde-friendly [`RetrySettings`](config::RetrySettings)
//!
//! # Examples
//!
//! ```rust
//! use relaunch_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryConfig::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .should_retry(RetryPredicate::classifier())
//!     .build();
//!
//! let value = retry_with_backoff(|| async {
//!     Ok::<_, std::io::Error>(42)
//! }, &config).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use relaunch_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        RetryConfig, RetryConfigBuilder, RetryPredicate, RetrySettings,
        create_retry_config_from_env,
    };
    pub use crate::error::{ConfigError, ErrorClass, ErrorClassifier, is_retryable_error};
    pub use crate::retry::{BackoffStrategy, RetryExecutor, RetryState, retry_with_backoff};
}
