//! Retry execution and backoff scheduling.
//!
//! # Key Types
//!
//! - [`BackoffStrategy`] - Core trait for retry strategies
//! - [`RetryExecutor`] - Strategy driven by a [`RetryConfig`](crate::config::RetryConfig)
//! - [`RetryState`] - Attempt counter and running delay of one retry call
//!
//! # Examples
//!
//! ```rust
//! use relaunch_core::config::RetryConfig;
//! use relaunch_core::retry::retry_with_backoff;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let value = retry_with_backoff(|| async {
//!     Ok::<_, std::io::Error>(42)
//! }, &RetryConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

mod executor;
mod scheduler;
mod strategy;

pub use executor::{RetryExecutor, retry_with_backoff};
pub use scheduler::{JITTER_RATIO, RetryState, jittered_delay};
pub use strategy::BackoffStrategy;
