//! Retrying supervision of external processes.
//!
//! Each attempt obtains a fresh handle from a factory and runs it to the
//! first of two outcomes:
//!
//! ```text
//! factory() ──None──► NoProcess
//!     │
//!   Some(h)
//!     ▼
//! subscribe ─► set_running(true) ─► select {
//!     exit(0)  ──► Ok(h)
//!     exit(n)  ──► Exited { code: n }
//!     deadline ──► set_running(false) ─► Timeout
//! }
//! ```
//!
//! The subscription is released on whichever path resolves the attempt;
//! signals arriving afterwards are not observed. Failed attempts are retried
//! by a [`RetryExecutor`] under the same [`RetryConfig`].

use crate::error::{ProcessError, Result};
use crate::handle::ProcessHandle;
use relaunch_core::config::RetryConfig;
use relaunch_core::retry::{BackoffStrategy, RetryExecutor};
use std::time::Duration;
use tracing::{debug, warn};

/// Runs process attempts through a [`RetryExecutor`].
///
/// # Examples
///
/// ```no_run
/// use relaunch_core::config::RetryConfig;
/// use relaunch_process::{CommandConfig, CommandProcess, ProcessSupervisor};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), relaunch_process::ProcessError> {
/// let supervisor = ProcessSupervisor::new(
///     RetryConfig::builder()
///         .max_attempts(3)
///         .timeout(Duration::from_secs(5))
///         .build(),
/// );
///
/// let process = supervisor
///     .run(|| Some(CommandProcess::new(CommandConfig::new("true"))))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProcessSupervisor {
    executor: RetryExecutor,
}

impl ProcessSupervisor {
    /// Create a supervisor. `config.timeout` bounds each attempt; zero stands
    /// for the default deadline.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            executor: RetryExecutor::new(config),
        }
    }

    /// The configuration driving this supervisor.
    pub fn config(&self) -> &RetryConfig {
        self.executor.config()
    }

    /// Run processes from `factory` until one exits with code 0 or the
    /// retry policy gives up. Returns the successful handle, or the error of
    /// the last attempt.
    pub async fn run<F, H>(&self, mut factory: F) -> Result<H>
    where
        F: FnMut() -> Option<H> + Send,
        H: ProcessHandle,
    {
        let timeout = self.config().attempt_timeout();
        self.executor
            .execute(|| supervise_attempt(factory(), timeout))
            .await
    }
}

/// Run a single process attempt with a deadline of `timeout`.
pub async fn supervise_attempt<H: ProcessHandle>(
    process: Option<H>,
    timeout: Duration,
) -> Result<H> {
    let Some(mut process) = process else {
        debug!("process factory returned no process");
        return Err(ProcessError::NoProcess);
    };

    let mut subscription = process.signals().subscribe();
    process.set_running(true);

    tokio::select! {
        biased;

        code = subscription.exited() => {
            subscription.release();
            if code == 0 {
                debug!("process exited successfully");
                Ok(process)
            } else {
                debug!(code, "process exited with failure");
                Err(ProcessError::Exited { code })
            }
        }
        _ = tokio::time::sleep(timeout) => {
            subscription.release();
            if process.is_running() {
                process.set_running(false);
            }
            warn!(timeout_ms = timeout.as_millis() as u64, "process timed out");
            Err(ProcessError::Timeout { timeout })
        }
    }
}

/// Supervise processes from `factory` under `config`.
///
/// Shorthand for `ProcessSupervisor::new(config.clone()).run(factory)`.
pub async fn retry_process<F, H>(factory: F, config: &RetryConfig) -> Result<H>
where
    F: FnMut() -> Option<H> + Send,
    H: ProcessHandle,
{
    ProcessSupervisor::new(config.clone()).run(factory).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::ProcessSignals;
    use relaunch_core::config::{DEFAULT_TIMEOUT, RetryPredicate};
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// What a fake process does once started.
    #[derive(Clone, Copy)]
    enum Script {
        ExitNow(i32),
        ExitAfter(Duration, i32),
        Hang,
    }

    struct FakeProcess {
        signals: ProcessSignals,
        running: Arc<AtomicBool>,
        script: Script,
    }

    impl FakeProcess {
        fn new(script: Script) -> Self {
            Self {
                signals: ProcessSignals::new(),
                running: Arc::new(AtomicBool::new(false)),
                script,
            }
        }
    }

    impl ProcessHandle for FakeProcess {
        fn signals(&self) -> &ProcessSignals {
            &self.signals
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn set_running(&mut self, running: bool) {
            self.running.store(running, Ordering::SeqCst);
            if !running {
                return;
            }
            match self.script {
                Script::ExitNow(code) => {
                    self.running.store(false, Ordering::SeqCst);
                    self.signals.emit_exited(code);
                }
                Script::ExitAfter(delay, code) => {
                    let signals = self.signals.clone();
                    let running = Arc::clone(&self.running);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        running.store(false, Ordering::SeqCst);
                        signals.emit_exited(code);
                    });
                }
                Script::Hang => {}
            }
        }
    }

    fn config(max_attempts: u32, timeout_ms: u64) -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(max_attempts)
            .initial_delay(Duration::from_millis(100))
            .enable_jitter(false)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_zero_succeeds_first_attempt() {
        let created = AtomicU32::new(0);

        let process = retry_process(
            || {
                created.fetch_add(1, Ordering::SeqCst);
                Some(FakeProcess::new(Script::ExitNow(0)))
            },
            &config(3, 1000),
        )
        .await
        .unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(!process.is_running());
        assert_eq!(process.signals().listener_count(), 0);
    }

    #[rstest]
    #[case::success(0, None)]
    #[case::failure(1, Some(ProcessError::Exited { code: 1 }))]
    #[case::abnormal(-1, Some(ProcessError::Exited { code: -1 }))]
    #[case::high_code(255, Some(ProcessError::Exited { code: 255 }))]
    #[tokio::test(start_paused = true)]
    async fn test_exit_code_outcome(#[case] code: i32, #[case] expected: Option<ProcessError>) {
        let result = supervise_attempt(
            Some(FakeProcess::new(Script::ExitNow(code))),
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(result.err(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_uses_default_deadline() {
        let started = tokio::time::Instant::now();
        let exit_after = Duration::from_secs(5);

        let result = retry_process(
            || Some(FakeProcess::new(Script::ExitAfter(exit_after, 0))),
            &config(1, 0),
        )
        .await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= exit_after);
        assert!(started.elapsed() < DEFAULT_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_exit_within_deadline() {
        let process = retry_process(
            || Some(FakeProcess::new(Script::ExitAfter(Duration::from_millis(30), 0))),
            &config(1, 50),
        )
        .await;

        assert!(process.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonzero_exit_is_retried_until_exhausted() {
        let created = AtomicU32::new(0);

        let result = retry_process(
            || {
                let n = created.fetch_add(1, Ordering::SeqCst) as i32;
                Some(FakeProcess::new(Script::ExitNow(n + 1)))
            },
            &config(3, 1000),
        )
        .await;

        assert_eq!(created.load(Ordering::SeqCst), 3);
        assert_eq!(result.err(), Some(ProcessError::Exited { code: 3 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_failed_exit() {
        let created = AtomicU32::new(0);

        let result = retry_process(
            || {
                let n = created.fetch_add(1, Ordering::SeqCst);
                let code = if n == 0 { 1 } else { 0 };
                Some(FakeProcess::new(Script::ExitNow(code)))
            },
            &config(3, 1000),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_process_times_out_and_is_stopped() {
        let running = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&running);
        let signals = ProcessSignals::new();
        let hub = signals.clone();

        let result = retry_process(
            move || {
                Some(FakeProcess {
                    signals: hub.clone(),
                    running: Arc::clone(&flag),
                    script: Script::Hang,
                })
            },
            &config(1, 50),
        )
        .await;

        assert_eq!(
            result.err(),
            Some(ProcessError::Timeout {
                timeout: Duration::from_millis(50)
            })
        );
        assert!(!running.load(Ordering::SeqCst));
        assert_eq!(signals.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_exit_after_timeout_is_ignored() {
        let signals = ProcessSignals::new();
        let hub = signals.clone();

        let result = supervise_attempt(
            Some(FakeProcess {
                signals: hub,
                running: Arc::new(AtomicBool::new(false)),
                script: Script::ExitAfter(Duration::from_millis(80), 0),
            }),
            Duration::from_millis(50),
        )
        .await;

        assert!(matches!(result, Err(ProcessError::Timeout { .. })));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(signals.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_process_goes_through_retry_policy() {
        let calls = AtomicU32::new(0);

        let result = retry_process(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                None::<FakeProcess>
            },
            &config(4, 1000),
        )
        .await;

        assert_eq!(result.err(), Some(ProcessError::NoProcess));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_can_veto_process_retries() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::builder()
            .max_attempts(5)
            .should_retry(RetryPredicate::from_fn(|err| {
                !err.to_string().contains("code 2")
            }))
            .timeout(Duration::from_millis(100))
            .build();

        let result = ProcessSupervisor::new(config)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(FakeProcess::new(Script::ExitNow(2)))
            })
            .await;

        assert_eq!(result.err().and_then(|e| e.exit_code()), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_boxed_handles() {
        let result = retry_process(
            || Some(Box::new(FakeProcess::new(Script::ExitNow(0))) as Box<dyn ProcessHandle>),
            &config(1, 100),
        )
        .await;

        assert!(result.is_ok());
    }
}
