//! Cooperative control signals for a running pipeline.
//!
//! Signals are fire-and-forget and observed only at stage checkpoints: an
//! in-flight activity is never interrupted, so billed external work is
//! allowed to finish rather than being abandoned mid-render. A paused run
//! suspends at its next checkpoint without consuming resources; a cancelled
//! run converts into a clean failed result.

use std::fmt;
use tokio::sync::watch;

#[derive(Debug, Clone, Default)]
struct ControlState {
    paused: bool,
    cancelled: Option<String>,
}

/// Signal side of a run's control channel.
///
/// Cheap to clone; all clones address the same run.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: watch::Sender<ControlState>,
}

impl ControlHandle {
    /// Requests a pause. Idempotent: repeated pauses are equivalent to one.
    ///
    /// The run suspends at its next checkpoint; any in-flight activity
    /// finishes first.
    pub fn pause(&self) {
        self.tx.send_modify(|state| state.paused = true);
    }

    /// Clears a pause. A resume while not paused is a no-op.
    pub fn resume(&self) {
        self.tx.send_modify(|state| state.paused = false);
    }

    /// Requests cancellation with a reason. The first reason wins; later
    /// cancels are no-ops.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_modify(|state| {
            if state.cancelled.is_none() {
                state.cancelled = Some(reason);
            }
        });
    }

    /// Returns true if a pause is currently requested.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.tx.borrow().paused
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().cancelled.is_some()
    }
}

/// Workflow side of the control channel; owned by the runner task.
#[derive(Debug)]
pub struct ControlGate {
    rx: watch::Receiver<ControlState>,
}

impl ControlGate {
    /// Observes the control flags at a checkpoint.
    ///
    /// Blocks while paused (waking only on signal changes), returns `Ok`
    /// when clear to proceed.
    ///
    /// # Errors
    ///
    /// Returns [`CancelRequested`] once cancellation is observed, including
    /// when every [`ControlHandle`] has been dropped while the run is paused
    /// (nothing could ever resume it).
    pub async fn checkpoint(&mut self) -> Result<(), CancelRequested> {
        loop {
            let state = self.rx.borrow_and_update().clone();
            if let Some(reason) = state.cancelled {
                return Err(CancelRequested { reason });
            }
            if !state.paused {
                return Ok(());
            }
            if self.rx.changed().await.is_err() {
                return Err(CancelRequested {
                    reason: "control handle dropped while paused".to_string(),
                });
            }
        }
    }
}

/// Creates a connected control handle/gate pair for one run.
#[must_use]
pub fn channel() -> (ControlHandle, ControlGate) {
    let (tx, rx) = watch::channel(ControlState::default());
    (ControlHandle { tx }, ControlGate { rx })
}

/// Raised at a checkpoint once cancellation has been requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequested {
    /// The reason supplied with the cancel signal.
    pub reason: String,
}

impl fmt::Display for CancelRequested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancelled: {}", self.reason)
    }
}

impl std::error::Error for CancelRequested {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn checkpoint_passes_when_idle() {
        let (_handle, mut gate) = channel();
        assert!(gate.checkpoint().await.is_ok());
    }

    #[tokio::test]
    async fn pause_is_idempotent_and_resume_unblocks() {
        let (handle, mut gate) = channel();

        handle.pause();
        handle.pause();
        assert!(handle.is_paused());

        let waiter = tokio::spawn(async move { gate.checkpoint().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        handle.resume();
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn resume_without_pause_is_a_noop() {
        let (handle, mut gate) = channel();
        handle.resume();
        assert!(!handle.is_paused());
        assert!(gate.checkpoint().await.is_ok());
    }

    #[tokio::test]
    async fn cancel_surfaces_at_checkpoint() {
        let (handle, mut gate) = channel();
        handle.cancel("user request");

        let err = gate.checkpoint().await.unwrap_err();
        assert_eq!(err.reason, "user request");
    }

    #[tokio::test]
    async fn first_cancel_reason_wins() {
        let (handle, mut gate) = channel();
        handle.cancel("first");
        handle.cancel("second");

        let err = gate.checkpoint().await.unwrap_err();
        assert_eq!(err.reason, "first");
    }

    #[tokio::test]
    async fn cancel_unblocks_a_paused_run() {
        let (handle, mut gate) = channel();
        handle.pause();

        let waiter = tokio::spawn(async move { gate.checkpoint().await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        handle.cancel("shutting down");
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err.reason, "shutting down");
    }

    #[tokio::test]
    async fn dropped_handle_cancels_a_paused_run() {
        let (handle, mut gate) = channel();
        handle.pause();
        drop(handle);

        let err = gate.checkpoint().await.unwrap_err();
        assert!(err.reason.contains("dropped"));
    }
}
