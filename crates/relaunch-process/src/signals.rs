//! Lifecycle signals of a supervised process.
//!
//! A [`ProcessSignals`] hub is owned by a process handle and fans out three
//! notifications: exit (with the exit code), stdout finished and stderr
//! finished. Listeners hold a [`Subscription`], which disconnects all three
//! receivers exactly once, either through [`Subscription::release`] or on drop.

use tokio::sync::broadcast::{self, error::RecvError};

const SIGNAL_CAPACITY: usize = 8;

/// Sender side of a process's lifecycle notifications.
///
/// Cloning yields another sender for the same notifications, which lets a
/// background task report the exit of the process it watches.
#[derive(Debug, Clone)]
pub struct ProcessSignals {
    exited: broadcast::Sender<i32>,
    stdout_finished: broadcast::Sender<()>,
    stderr_finished: broadcast::Sender<()>,
}

impl Default for ProcessSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSignals {
    /// Create a hub with no listeners.
    pub fn new() -> Self {
        Self {
            exited: broadcast::channel(SIGNAL_CAPACITY).0,
            stdout_finished: broadcast::channel(SIGNAL_CAPACITY).0,
            stderr_finished: broadcast::channel(SIGNAL_CAPACITY).0,
        }
    }

    /// Connect a listener to all three notifications.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            exited: Some(self.exited.subscribe()),
            stdout_finished: Some(self.stdout_finished.subscribe()),
            stderr_finished: Some(self.stderr_finished.subscribe()),
        }
    }

    /// Report that the process exited with `code`.
    ///
    /// Notifications sent while nobody listens are dropped.
    pub fn emit_exited(&self, code: i32) {
        let _ = self.exited.send(code);
    }

    /// Report that the process closed its standard output.
    pub fn emit_stdout_finished(&self) {
        let _ = self.stdout_finished.send(());
    }

    /// Report that the process closed its standard error.
    pub fn emit_stderr_finished(&self) {
        let _ = self.stderr_finished.send(());
    }

    /// Number of connected receivers across all three notifications.
    pub fn listener_count(&self) -> usize {
        self.exited.receiver_count()
            + self.stdout_finished.receiver_count()
            + self.stderr_finished.receiver_count()
    }
}

/// A listener connected to a [`ProcessSignals`] hub.
///
/// The stream-finished receivers are held for bookkeeping only; their
/// notifications are never inspected.
#[derive(Debug)]
pub struct Subscription {
    exited: Option<broadcast::Receiver<i32>>,
    stdout_finished: Option<broadcast::Receiver<()>>,
    stderr_finished: Option<broadcast::Receiver<()>>,
}

impl Subscription {
    /// Wait for the next exit notification.
    ///
    /// Never resolves once the subscription is released or when every sender
    /// has gone away without reporting an exit. Cancel safe.
    pub async fn exited(&mut self) -> i32 {
        while let Some(receiver) = self.exited.as_mut() {
            match receiver.recv().await {
                Ok(code) => return code,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => self.exited = None,
            }
        }
        std::future::pending().await
    }

    /// Whether the listeners are still connected.
    pub fn is_active(&self) -> bool {
        self.exited.is_some() || self.stdout_finished.is_some() || self.stderr_finished.is_some()
    }

    /// Disconnect all listeners. Returns `true` only for the call that
    /// actually disconnected them; later calls are no-ops.
    pub fn release(&mut self) -> bool {
        let was_active = self.is_active();
        self.exited = None;
        self.stdout_finished = None;
        self.stderr_finished = None;
        was_active
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_exit_code_delivered() {
        let signals = ProcessSignals::new();
        let mut subscription = signals.subscribe();

        signals.emit_exited(7);
        assert_eq!(subscription.exited().await, 7);
    }

    #[test]
    fn test_release_is_idempotent() {
        let signals = ProcessSignals::new();
        let mut subscription = signals.subscribe();
        assert_eq!(signals.listener_count(), 3);

        assert!(subscription.release());
        assert!(!subscription.release());
        assert!(!subscription.is_active());
        assert_eq!(signals.listener_count(), 0);
    }

    #[test]
    fn test_drop_releases() {
        let signals = ProcessSignals::new();
        {
            let _subscription = signals.subscribe();
            assert_eq!(signals.listener_count(), 3);
        }
        assert_eq!(signals.listener_count(), 0);
    }

    #[test]
    fn test_emit_without_listeners_is_ignored() {
        let signals = ProcessSignals::new();
        signals.emit_exited(0);
        signals.emit_stdout_finished();
        signals.emit_stderr_finished();
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_subscription_never_resolves() {
        let signals = ProcessSignals::new();
        let mut subscription = signals.subscribe();
        subscription.release();
        signals.emit_exited(0);

        let waited = tokio::time::timeout(Duration::from_secs(1), subscription.exited()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_hub_never_resolves() {
        let signals = ProcessSignals::new();
        let mut subscription = signals.subscribe();
        drop(signals);

        let waited = tokio::time::timeout(Duration::from_secs(1), subscription.exited()).await;
        assert!(waited.is_err());
    }
}
