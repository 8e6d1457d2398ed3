//! Error types and error classification.
//!
//! - [`ConfigError`]: failures while loading [`RetrySettings`](crate::config::RetrySettings).
//! - [`ErrorClassifier`]: decides from an error's text whether a retry is warranted.

mod classify;

pub use classify::{
    ErrorClass, ErrorClassifier, PERMANENT_MARKERS, TRANSIENT_MARKERS, is_retryable_error,
};

use thiserror::Error;

/// Errors produced while loading retry settings.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid TOML retry settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON document could not be parsed.
    #[error("invalid JSON retry settings: {0}")]
    Json(#[from] serde_json::Error),

    /// A field is outside the range the executor accepts.
    #[error("invalid retry setting `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field, as spelled in the document.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Toml(_) => "config_toml",
            ConfigError::Json(_) => "config_json",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }
}
