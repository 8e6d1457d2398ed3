//! Backoff scheduling.
//!
//! The delay before the next attempt is computed from a running
//! `current_delay`:
//!
//! ```text
//! delay         = min(current_delay, max_delay)
//! jitter        = random[0, 1) * 0.3 * delay      (if enabled)
//! wait          = delay + jitter
//! current_delay = current_delay * backoff_multiplier
//! ```
//!
//! The stored `current_delay` is never capped: it keeps growing after
//! `max_delay` has been reached, and the cap only applies when a delay is
//! selected.

use crate::config::RetryConfig;
use std::time::Duration;

/// Upper bound of the jitter term, as a fraction of the capped delay.
pub const JITTER_RATIO: f64 = 0.3;

/// Per-call retry state: the attempt counter and the running delay.
///
/// Owned by a single retry call and never shared.
///
/// # Examples
///
/// ```rust
/// use relaunch_core::config::RetryConfig;
/// use relaunch_core::retry::RetryState;
/// use std::time::Duration;
///
/// let config = RetryConfig::builder()
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_millis(300))
///     .enable_jitter(false)
///     .build();
///
/// let mut state = RetryState::new(&config);
/// assert_eq!(state.next_delay(&config), Duration::from_millis(100));
/// assert_eq!(state.next_delay(&config), Duration::from_millis(200));
/// assert_eq!(state.next_delay(&config), Duration::from_millis(300));
/// // The stored delay kept growing past the cap.
/// assert_eq!(state.current_delay_ms(), 800.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    attempt: u32,
    current_delay_ms: f64,
}

impl RetryState {
    /// Fresh state: no attempt made yet, delay at `initial_delay`.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            current_delay_ms: config.initial_delay.as_secs_f64() * 1000.0,
        }
    }

    /// Number of attempts started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The running (uncapped) delay, in milliseconds.
    pub fn current_delay_ms(&self) -> f64 {
        self.current_delay_ms
    }

    /// Record the start of a new attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt = self.attempt.saturating_add(1);
        self.attempt
    }

    /// The capped delay the next wait would use, before jitter.
    pub fn base_delay(&self, config: &RetryConfig) -> Duration {
        let max_ms = config.max_delay.as_secs_f64() * 1000.0;
        duration_from_ms(self.current_delay_ms.min(max_ms))
    }

    /// Select the delay for the upcoming wait and advance the running delay.
    pub fn next_delay(&mut self, config: &RetryConfig) -> Duration {
        self.next_delay_with(config, rand::random::<f64>())
    }

    /// Like [`next_delay`](Self::next_delay) with an explicit jitter sample
    /// in `[0, 1)`. The sample is ignored when jitter is disabled.
    pub fn next_delay_with(&mut self, config: &RetryConfig, sample: f64) -> Duration {
        let base = self.base_delay(config);
        let delay = if config.enable_jitter {
            jittered_delay(base, sample)
        } else {
            base
        };

        self.current_delay_ms *= config.backoff_multiplier;
        delay
    }
}

/// Add `sample × JITTER_RATIO × base` to `base`.
///
/// `sample` is clamped to `[0, 1]`, so the result stays within
/// `[base, 1.3 × base]`.
pub fn jittered_delay(base: Duration, sample: f64) -> Duration {
    let sample = if sample.is_nan() { 0.0 } else { sample.clamp(0.0, 1.0) };
    let base_ms = base.as_secs_f64() * 1000.0;
    duration_from_ms(base_ms + sample * JITTER_RATIO * base_ms)
}

fn duration_from_ms(ms: f64) -> Duration {
    if ms.is_nan() || ms <= 0.0 {
        return Duration::ZERO;
    }
    // `as` saturates, so an unbounded delay becomes `u64::MAX` nanoseconds.
    Duration::from_nanos((ms * 1_000_000.0).round() as u64)
}
