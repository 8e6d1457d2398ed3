//! Process supervision on top of `relaunch-core`.
//!
//! Starts external processes, waits for them to exit successfully within a
//! deadline, and relaunches them with exponential backoff when they fail.
//!
//! # Architecture
//!
//! - **ProcessHandle trait**: the process as seen by the supervisor
//! - **ProcessSignals**: exit and stream-finished notifications
//! - **ProcessSupervisor**: one attempt per handle, retried by a `RetryExecutor`

#![deny(unsafe_code)]
#![warn(missing_docs)]
//! - **CommandProcess**: handle backed by `tokio::process`
//!
//! # Usage
//!
//! ```no_run
//! use relaunch_core::config::RetryConfig;
//! use relaunch_process::{CommandConfig, CommandProcess, retry_process};
//!
//! # async fn example() -> relaunch_process::Result<()> {
//! let config = RetryConfig::from_env("WORKER");
//! let process = retry_process(
//!     || Some(CommandProcess::new(CommandConfig::new("sh").with_args(["-c", "exit 0"]))),
//!     &config,
//! )
//! .await?;
//! process.output_drained().await;
//! println!("{}", process.stdout().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod handle;
pub mod signals;
pub mod supervisor;

// Re-export commonly used types
pub use command::{CommandConfig, CommandProcess};
pub use error::{ProcessError, Result};
pub use handle::ProcessHandle;
pub use signals::{ProcessSignals, Subscription};
pub use supervisor::{ProcessSupervisor, retry_process, supervise_attempt};
