//! Process supervision error types

use std::time::Duration;
use thiserror::Error;

/// Result type for process supervision
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Why a supervised process attempt failed.
///
/// Every variant goes through the normal retry policy: none is special-cased
/// as fatal.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// The factory did not produce a process.
    #[error("process factory returned no process")]
    NoProcess,

    /// The process terminated with a nonzero exit code.
    #[error("process exited with code {code}")]
    Exited {
        /// The reported exit code.
        code: i32,
    },

    /// The process did not exit within the per-attempt deadline.
    #[error("process timeout after {timeout:?}")]
    Timeout {
        /// The deadline that elapsed.
        timeout: Duration,
    },
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::NoProcess => "process_missing",
            ProcessError::Exited { .. } => "process_exited",
            ProcessError::Timeout { .. } => "process_timeout",
        }
    }

    /// The exit code, for [`ProcessError::Exited`].
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Exited { code } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaunch_core::error::is_retryable_error;

    #[test]
    fn test_messages() {
        assert_eq!(
            ProcessError::NoProcess.to_string(),
            "process factory returned no process"
        );
        assert_eq!(
            ProcessError::Exited { code: 2 }.to_string(),
            "process exited with code 2"
        );
        assert_eq!(
            ProcessError::Timeout {
                timeout: Duration::from_millis(50)
            }
            .to_string(),
            "process timeout after 50ms"
        );
    }

    #[test]
    fn test_all_variants_are_retryable_by_default_classifier() {
        for err in [
            ProcessError::NoProcess,
            ProcessError::Exited { code: 1 },
            ProcessError::Timeout {
                timeout: Duration::from_secs(10),
            },
        ] {
            assert!(is_retryable_error(&err), "{err} should be retryable");
        }
    }

    #[test]
    fn test_labels_and_exit_code() {
        assert_eq!(ProcessError::NoProcess.as_label(), "process_missing");
        assert_eq!(ProcessError::Exited { code: 4 }.exit_code(), Some(4));
        assert_eq!(
            ProcessError::Timeout {
                timeout: Duration::ZERO
            }
            .exit_code(),
            None
        );
    }
}
