//! Process handle backed by `tokio::process`.

use crate::handle::ProcessHandle;
use crate::signals::ProcessSignals;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

/// Exit code reported when the process could not be spawned, was killed by a
/// signal, or its status could not be collected.
pub const ABNORMAL_EXIT_CODE: i32 = -1;

const STREAM_COUNT: u8 = 2;

/// Configuration for spawning a command
#[derive(Clone, Debug)]
pub struct CommandConfig {
    /// Program to execute
    pub program: String,

    /// Arguments to pass to the program
    pub args: Vec<String>,

    /// Environment variables to set
    pub env: HashMap<String, String>,

    /// Start from an empty environment instead of inheriting the parent's
    pub clear_env: bool,

    /// Working directory of the child
    pub current_dir: Option<PathBuf>,
}

impl CommandConfig {
    /// Create a configuration for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            clear_env: false,
            current_dir: None,
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Pass only the variables set with [`with_env`](Self::with_env) to the child
    pub fn clear_env(mut self) -> Self {
        self.clear_env = true;
        self
    }

    /// Set the working directory
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if self.clear_env {
            cmd.env_clear();
        }
        cmd.envs(&self.env);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[derive(Debug)]
struct CapturedOutput {
    stdout: OnceLock<String>,
    stderr: OnceLock<String>,
    drained: watch::Sender<u8>,
}

impl CapturedOutput {
    fn new() -> Self {
        Self {
            stdout: OnceLock::new(),
            stderr: OnceLock::new(),
            drained: watch::Sender::new(0),
        }
    }

    fn mark_drained(&self) {
        self.drained.send_modify(|count| *count += 1);
    }

    /// No stream will ever be drained (the command did not spawn).
    fn abandon(&self) {
        self.drained.send_replace(STREAM_COUNT);
    }
}

/// A [`ProcessHandle`] that runs a [`CommandConfig`].
///
/// `set_running(true)` spawns the command on the current tokio runtime. A
/// background task reports the exit code as soon as the child exits; stdout
/// and stderr are drained separately and announced through the
/// stream-finished signals, so a grandchild holding a pipe open does not
/// delay the exit. [`output_drained`](Self::output_drained) waits for the
/// captured text. `set_running(false)` kills the child. Dropping the handle kills a child
/// that is still running.
///
/// Each handle runs its command at most once: supervisors obtain a fresh
/// handle per attempt.
#[derive(Debug)]
pub struct CommandProcess {
    config: CommandConfig,
    signals: ProcessSignals,
    running: Arc<AtomicBool>,
    output: Arc<CapturedOutput>,
    kill: Option<oneshot::Sender<()>>,
    started: bool,
}

impl CommandProcess {
    /// Create a handle; the command is not started yet.
    pub fn new(config: CommandConfig) -> Self {
        Self {
            config,
            signals: ProcessSignals::new(),
            running: Arc::new(AtomicBool::new(false)),
            output: Arc::new(CapturedOutput::new()),
            kill: None,
            started: false,
        }
    }

    /// Get the command configuration
    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    /// Wait until stdout and stderr have both been drained.
    ///
    /// Returns immediately when the command was never started or failed to
    /// spawn. Waits as long as any process keeps one of the pipes open.
    pub async fn output_drained(&self) {
        if !self.started {
            return;
        }
        let mut drained = self.output.drained.subscribe();
        let _ = drained.wait_for(|count| *count >= STREAM_COUNT).await;
    }

    /// Captured standard output, once the stream has been drained.
    pub fn stdout(&self) -> Option<&str> {
        self.output.stdout.get().map(String::as_str)
    }

    /// Captured standard error, once the stream has been drained.
    pub fn stderr(&self) -> Option<&str> {
        self.output.stderr.get().map(String::as_str)
    }

    fn start(&mut self) {
        if self.started {
            debug!(program = %self.config.program, "command already started");
            return;
        }
        self.started = true;

        let Ok(runtime) = Handle::try_current() else {
            warn!(program = %self.config.program, "no tokio runtime to spawn the command on");
            self.output.abandon();
            self.signals.emit_exited(ABNORMAL_EXIT_CODE);
            return;
        };

        let mut child = match self.config.command().spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(program = %self.config.program, error = %err, "failed to spawn command");
                self.output.abandon();
                self.signals.emit_exited(ABNORMAL_EXIT_CODE);
                return;
            }
        };
        debug!(program = %self.config.program, pid = child.id(), "command spawned");

        let (kill_tx, kill_rx) = oneshot::channel();
        self.kill = Some(kill_tx);
        self.running.store(true, Ordering::SeqCst);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        runtime.spawn(watch_child(
            child,
            kill_rx,
            Streams { stdout, stderr },
            self.signals.clone(),
            Arc::clone(&self.running),
            Arc::clone(&self.output),
        ));
    }

    fn stop(&mut self) {
        if let Some(kill) = self.kill.take() {
            debug!(program = %self.config.program, "stopping command");
            let _ = kill.send(());
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl ProcessHandle for CommandProcess {
    fn signals(&self) -> &ProcessSignals {
        &self.signals
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set_running(&mut self, running: bool) {
        if running {
            self.start();
        } else {
            self.stop();
        }
    }
}

struct Streams {
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
}

async fn watch_child(
    mut child: Child,
    kill: oneshot::Receiver<()>,
    Streams {
        stdout: out_stream,
        stderr: err_stream,
    }: Streams,
    signals: ProcessSignals,
    running: Arc<AtomicBool>,
    output: Arc<CapturedOutput>,
) {
    {
        let signals = signals.clone();
        let output = Arc::clone(&output);
        tokio::spawn(async move {
            let _ = output.stdout.set(drain(out_stream).await);
            output.mark_drained();
            signals.emit_stdout_finished();
        });
    }
    {
        let signals = signals.clone();
        tokio::spawn(async move {
            let _ = output.stderr.set(drain(err_stream).await);
            output.mark_drained();
            signals.emit_stderr_finished();
        });
    }

    // A dropped sender (handle gone) also kills the child.
    let status = tokio::select! {
        status = child.wait() => status,
        _ = kill => {
            if let Err(err) = child.start_kill() {
                debug!(error = %err, "kill failed; child already exited");
            }
            child.wait().await
        }
    };
    running.store(false, Ordering::SeqCst);

    let code = match status {
        Ok(status) => status.code().unwrap_or(ABNORMAL_EXIT_CODE),
        Err(err) => {
            warn!(error = %err, "failed to collect command status");
            ABNORMAL_EXIT_CODE
        }
    };

    debug!(code, "command exited");
    signals.emit_exited(code);
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream
        && let Err(err) = stream.read_to_end(&mut buf).await
    {
        debug!(error = %err, "failed to read command output");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_config_builder() {
        let config = CommandConfig::new("sh")
            .with_arg("-c")
            .with_args(["exit 0"])
            .with_env("MODE", "test")
            .clear_env()
            .with_current_dir("/tmp");

        assert_eq!(config.program, "sh");
        assert_eq!(config.args, vec!["-c".to_string(), "exit 0".to_string()]);
        assert_eq!(config.env.get("MODE"), Some(&"test".to_string()));
        assert!(config.clear_env);
        assert_eq!(config.current_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_new_handle_is_idle() {
        let process = CommandProcess::new(CommandConfig::new("true"));
        assert!(!process.is_running());
        assert_eq!(process.stdout(), None);
        assert_eq!(process.stderr(), None);
    }

    #[test]
    fn test_start_without_runtime_reports_abnormal_exit() {
        let mut process = CommandProcess::new(CommandConfig::new("true"));
        let mut subscription = process.signals().subscribe();

        process.set_running(true);

        assert!(!process.is_running());
        let code = tokio_test::block_on(subscription.exited());
        assert_eq!(code, ABNORMAL_EXIT_CODE);
        tokio_test::block_on(process.output_drained());
        assert_eq!(process.stdout(), None);
    }

    #[test]
    fn test_unstarted_output_is_not_awaited() {
        let process = CommandProcess::new(CommandConfig::new("true"));
        tokio_test::block_on(process.output_drained());
    }
}
