//! Retry configuration.
//!
//! [`RetryConfig`] is the runtime configuration consumed by the executor and
//! the process supervisor. [`RetrySettings`] is its plain-data view, which can
//! be deserialized from TOML or JSON.

use crate::error::{ConfigError, ErrorClassifier};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum number of attempts (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);
/// Default cap applied to each individual delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);
/// Default growth factor of the delay.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
/// Default per-attempt deadline for supervised processes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

type PredicateFn = dyn Fn(&dyn Error) -> bool + Send + Sync;

/// Decides whether a failed attempt may be retried.
///
/// Cheap to clone; the underlying closure is shared.
///
/// # Examples
///
/// ```rust
/// use relaunch_core::config::RetryPredicate;
///
/// let only_io = RetryPredicate::from_fn(|err| err.is::<std::io::Error>());
/// let err = std::io::Error::other("boom");
/// assert!(only_io.test(&err));
/// ```
#[derive(Clone)]
pub struct RetryPredicate {
    inner: Arc<PredicateFn>,
}

impl RetryPredicate {
    /// Wrap a closure as a predicate.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&dyn Error) -> bool + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Retry every error. This is the default.
    pub fn always() -> Self {
        Self::from_fn(|_| true)
    }

    /// Never retry.
    pub fn never() -> Self {
        Self::from_fn(|_| false)
    }

    /// Retry according to the default [`ErrorClassifier`].
    pub fn classifier() -> Self {
        Self::with_classifier(ErrorClassifier::default())
    }

    /// Retry according to a custom [`ErrorClassifier`].
    pub fn with_classifier(classifier: ErrorClassifier) -> Self {
        Self::from_fn(move |err| classifier.is_retryable(Some(err)))
    }

    /// Evaluate the predicate.
    pub fn test(&self, error: &dyn Error) -> bool {
        (self.inner)(error)
    }
}

impl Default for RetryPredicate {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for RetryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryPredicate(..)")
    }
}

/// Configuration for one retry call.
///
/// The configuration is borrowed by the executor for the whole call, so it
/// cannot change while attempts are in flight.
///
/// # Examples
///
/// ```rust
/// use relaunch_core::config::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::builder()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(250))
///     .enable_jitter(false)
///     .build();
///
/// assert_eq!(config.max_attempts, 5);
/// assert_eq!(config.max_delay, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Cap applied to each individual delay.
    pub max_delay: Duration,

    /// Factor applied to the stored delay after every failed attempt.
    pub backoff_multiplier: f64,

    /// Add up to 30% random jitter to each delay.
    pub enable_jitter: bool,

    /// Whether a given error may be retried.
    pub should_retry: RetryPredicate,

    /// Per-attempt deadline, used only by process supervision.
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            enable_jitter: true,
            should_retry: RetryPredicate::always(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryConfig {
    /// Create a new builder for configuring retries.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Build a configuration from plain settings, retrying every error.
    pub fn with_settings(settings: RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: clamp_multiplier(settings.backoff_multiplier),
            enable_jitter: settings.enable_jitter,
            should_retry: RetryPredicate::always(),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }

    /// Configuration for the given environment prefix.
    ///
    /// The prefix is accepted for API compatibility but no variables are read:
    /// the result is always the default configuration, classified by the
    /// default [`ErrorClassifier`].
    pub fn from_env(prefix: &str) -> Self {
        let _ = prefix;
        Self {
            should_retry: RetryPredicate::classifier(),
            ..Self::default()
        }
    }

    /// Deadline applied to one process attempt. A zero `timeout` means the
    /// default of 10s.
    pub fn attempt_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Plain-data view of this configuration (the predicate is not included).
    pub fn settings(&self) -> RetrySettings {
        RetrySettings {
            max_attempts: self.max_attempts,
            initial_delay_ms: duration_ms(self.initial_delay),
            max_delay_ms: duration_ms(self.max_delay),
            backoff_multiplier: self.backoff_multiplier,
            enable_jitter: self.enable_jitter,
            timeout_ms: duration_ms(self.timeout),
        }
    }
}

impl From<RetrySettings> for RetryConfig {
    fn from(settings: RetrySettings) -> Self {
        Self::with_settings(settings)
    }
}

/// Shorthand for [`RetryConfig::from_env`].
pub fn create_retry_config_from_env(prefix: &str) -> RetryConfig {
    RetryConfig::from_env(prefix)
}

fn clamp_multiplier(multiplier: f64) -> f64 {
    if multiplier >= 1.0 { multiplier } else { 1.0 }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`RetryConfig`].
///
/// Unset fields fall back to the defaults.
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    max_attempts: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    backoff_multiplier: Option<f64>,
    enable_jitter: Option<bool>,
    should_retry: Option<RetryPredicate>,
    timeout: Option<Duration>,
}

impl RetryConfigBuilder {
    /// Set the maximum number of attempts. Zero is raised to one.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Set the delay before the first retry.
    ///
    /// Default: 1s
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the cap applied to each delay.
    ///
    /// Default: 30s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the backoff multiplier. Values below 1.0 (or NaN) are raised to 1.0.
    ///
    /// Default: 2.0
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(clamp_multiplier(multiplier));
        self
    }

    /// Enable or disable jitter.
    ///
    /// Default: enabled
    pub fn enable_jitter(mut self, enable: bool) -> Self {
        self.enable_jitter = Some(enable);
        self
    }

    /// Set the retry predicate.
    ///
    /// Default: [`RetryPredicate::always`]
    pub fn should_retry(mut self, predicate: RetryPredicate) -> Self {
        self.should_retry = Some(predicate);
        self
    }

    /// Set the retry predicate from a closure.
    pub fn should_retry_fn<F>(self, f: F) -> Self
    where
        F: Fn(&dyn Error) -> bool + Send + Sync + 'static,
    {
        self.should_retry(RetryPredicate::from_fn(f))
    }

    /// Set the per-attempt process deadline. Zero stands for the default
    /// (see [`RetryConfig::attempt_timeout`]).
    ///
    /// Default: 10s
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the [`RetryConfig`].
    pub fn build(self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            initial_delay: self.initial_delay.unwrap_or(DEFAULT_INITIAL_DELAY),
            max_delay: self.max_delay.unwrap_or(DEFAULT_MAX_DELAY),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or(DEFAULT_BACKOFF_MULTIPLIER),
            enable_jitter: self.enable_jitter.unwrap_or(true),
            should_retry: self.should_retry.unwrap_or_default(),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

/// Plain-data retry settings, suitable for configuration files.
///
/// Durations are integer milliseconds. Missing keys take the defaults.
///
/// ```toml
/// maxAttempts = 5
/// initialDelay = 500
/// enableJitter = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrySettings {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(rename = "initialDelay")]
    pub initial_delay_ms: u64,

    /// Cap applied to each delay, in milliseconds.
    #[serde(rename = "maxDelay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier.
    pub backoff_multiplier: f64,

    /// Add random jitter to each delay.
    pub enable_jitter: bool,

    /// Per-attempt process deadline, in milliseconds.
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetryConfig::default().settings()
    }
}

impl RetrySettings {
    /// Parse and validate settings from a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate settings from a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the ranges the executor relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "maxAttempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                field: "backoffMultiplier",
                reason: format!("must be a finite number >= 1, got {}", self.backoff_multiplier),
            });
        }
        Ok(())
    }
}
