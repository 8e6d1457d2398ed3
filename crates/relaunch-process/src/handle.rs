//! The process abstraction driven by the supervisor.

use crate::signals::ProcessSignals;

/// An external process as seen by the supervisor.
///
/// The handle exposes a `running` flag (setting it to `true` starts the
/// process, setting it to `false` forces it down) and a [`ProcessSignals`]
/// hub reporting exit and stream completion.
///
/// Creating the process is up to the host: the supervisor only receives
/// handles from a factory. [`CommandProcess`](crate::CommandProcess) is the
/// implementation backed by `tokio::process`.
///
/// # Examples
///
/// A handle that reports success as soon as it is started:
///
/// ```rust
/// use relaunch_process::{ProcessHandle, ProcessSignals};
///
/// struct Instant {
///     signals: ProcessSignals,
///     running: bool,
/// }
///
/// impl ProcessHandle for Instant {
///     fn signals(&self) -> &ProcessSignals {
///         &self.signals
///     }
///
///     fn is_running(&self) -> bool {
///         self.running
///     }
///
///     fn set_running(&mut self, running: bool) {
///         self.running = running;
///         if running {
///             self.running = false;
///             self.signals.emit_exited(0);
///         }
///     }
/// }
/// ```
pub trait ProcessHandle: Send + 'static {
    /// The lifecycle notifications of this process.
    fn signals(&self) -> &ProcessSignals;

    /// Whether the process is currently running.
    fn is_running(&self) -> bool;

    /// Start (`true`) or force down (`false`) the process.
    fn set_running(&mut self, running: bool);
}

impl<H: ProcessHandle + ?Sized> ProcessHandle for Box<H> {
    fn signals(&self) -> &ProcessSignals {
        (**self).signals()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn set_running(&mut self, running: bool) {
        (**self).set_running(running)
    }
}
