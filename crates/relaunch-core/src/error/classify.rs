//! Text-based error classification.
//!
//! Errors are classified by searching their lower-cased `Display` output for
//! known markers. Permanent markers take priority over transient ones, so an
//! error mentioning both (`"404 timeout"`) is not retried. Errors matching
//! neither list are retried.

use std::borrow::Cow;
use std::error::Error;

/// Markers of errors that will fail again if retried.
pub const PERMANENT_MARKERS: &[&str] = &[
    "authentication",
    "unauthorized",
    "401",
    "403",
    "404",
    "invalid",
    "malformed",
    "syntax",
];

/// Markers of errors that are likely to go away on their own.
pub const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "network",
    "connection",
    "econnrefused",
    "econnreset",
    "etimedout",
    "temporary",
    "503",
    "502",
    "504",
];

/// Outcome of classifying an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A permanent marker matched; do not retry.
    Permanent,
    /// A transient marker matched; retry.
    Transient,
    /// Nothing matched; retried optimistically.
    Unknown,
}

impl ErrorClass {
    /// Whether errors of this class are retried.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorClass::Permanent)
    }
}

/// Marker-based error classifier.
///
/// The default classifier uses [`PERMANENT_MARKERS`] and [`TRANSIENT_MARKERS`].
/// Additional markers can be added; they are matched case-insensitively.
///
/// # Examples
///
/// ```rust
/// use relaunch_core::error::{ErrorClass, ErrorClassifier};
///
/// let classifier = ErrorClassifier::default().with_permanent_marker("quota exceeded");
///
/// assert_eq!(classifier.classify("Quota Exceeded for today"), ErrorClass::Permanent);
/// assert_eq!(classifier.classify("503 Service Unavailable"), ErrorClass::Transient);
/// assert_eq!(classifier.classify("something odd"), ErrorClass::Unknown);
/// ```
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    permanent: Vec<Cow<'static, str>>,
    transient: Vec<Cow<'static, str>>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            permanent: PERMANENT_MARKERS.iter().map(|m| Cow::Borrowed(*m)).collect(),
            transient: TRANSIENT_MARKERS.iter().map(|m| Cow::Borrowed(*m)).collect(),
        }
    }
}

impl ErrorClassifier {
    /// Add a marker that makes an error permanent.
    pub fn with_permanent_marker(mut self, marker: impl Into<Cow<'static, str>>) -> Self {
        self.permanent.push(lowercase(marker.into()));
        self
    }

    /// Add a marker that makes an error transient.
    pub fn with_retryable_marker(mut self, marker: impl Into<Cow<'static, str>>) -> Self {
        self.transient.push(lowercase(marker.into()));
        self
    }

    /// Classify an error message.
    pub fn classify(&self, message: &str) -> ErrorClass {
        let message = message.to_lowercase();

        if self.permanent.iter().any(|m| message.contains(&**m)) {
            ErrorClass::Permanent
        } else if self.transient.iter().any(|m| message.contains(&**m)) {
            ErrorClass::Transient
        } else {
            ErrorClass::Unknown
        }
    }

    /// Whether `error` should be retried. An absent error never is.
    pub fn is_retryable(&self, error: Option<&dyn Error>) -> bool {
        match error {
            Some(error) => self.classify(&error.to_string()).is_retryable(),
            None => false,
        }
    }
}

fn lowercase(marker: Cow<'static, str>) -> Cow<'static, str> {
    if marker.chars().any(char::is_uppercase) {
        Cow::Owned(marker.to_lowercase())
    } else {
        marker
    }
}

/// Classify `error` with the default [`ErrorClassifier`].
///
/// Usable directly as a retry predicate:
///
/// ```rust
/// use relaunch_core::config::RetryConfig;
/// use relaunch_core::error::is_retryable_error;
///
/// let config = RetryConfig::builder().should_retry_fn(is_retryable_error).build();
/// assert!(!config.should_retry.test(&std::io::Error::other("401 Unauthorized")));
/// ```
pub fn is_retryable_error(error: &dyn Error) -> bool {
    ErrorClassifier::default().is_retryable(Some(error))
}
