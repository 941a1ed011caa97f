//! Cooperative control for the supervisor loop.
//!
//! Same signal discipline as the single-run pipeline — flags observed at
//! checkpoints, in-flight work never interrupted — plus a `scale` signal
//! that resizes the *next* round's batch. Scaling never retroactively
//! resizes a round already in flight.

use reelforge_pipeline::control::CancelRequested;
use std::time::Duration;
use tokio::sync::watch;

/// Lower clamp for the batch scale multiplier.
pub const SCALE_MIN: f64 = 0.1;

/// Upper clamp for the batch scale multiplier.
pub const SCALE_MAX: f64 = 10.0;

#[derive(Debug, Clone)]
struct SupervisorState {
    paused: bool,
    cancelled: Option<String>,
    scale: f64,
}

impl Default for SupervisorState {
    fn default() -> Self {
        Self {
            paused: false,
            cancelled: None,
            scale: 1.0,
        }
    }
}

/// Status projection of a supervisor's control state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupervisorStatus {
    /// Whether a pause is requested.
    pub paused: bool,
    /// Whether cancellation is requested.
    pub cancelled: bool,
    /// The current batch scale multiplier.
    pub scale: f64,
}

/// Signal side of a supervisor's control channel.
#[derive(Debug, Clone)]
pub struct SupervisorControl {
    tx: watch::Sender<SupervisorState>,
}

impl SupervisorControl {
    /// Requests a pause; the loop suspends at its next round checkpoint.
    pub fn pause(&self) {
        self.tx.send_modify(|state| state.paused = true);
    }

    /// Clears a pause.
    pub fn resume(&self) {
        self.tx.send_modify(|state| state.paused = false);
    }

    /// Requests cancellation; the loop converts it into a final summary.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_modify(|state| {
            if state.cancelled.is_none() {
                state.cancelled = Some(reason);
            }
        });
    }

    /// Adjusts the batch-size multiplier, clamped to
    /// [`SCALE_MIN`]..=[`SCALE_MAX`]. Applies from the next round.
    pub fn scale(&self, factor: f64) {
        let clamped = factor.clamp(SCALE_MIN, SCALE_MAX);
        self.tx.send_modify(|state| state.scale = clamped);
    }

    /// Returns the current status projection.
    #[must_use]
    pub fn status(&self) -> SupervisorStatus {
        let state = self.tx.borrow();
        SupervisorStatus {
            paused: state.paused,
            cancelled: state.cancelled.is_some(),
            scale: state.scale,
        }
    }
}

/// Loop side of the control channel.
#[derive(Debug)]
pub struct SupervisorGate {
    rx: watch::Receiver<SupervisorState>,
}

impl SupervisorGate {
    /// Observes the control flags at a round checkpoint; blocks while
    /// paused.
    ///
    /// # Errors
    ///
    /// Returns [`CancelRequested`] once cancellation is observed, including
    /// when every control handle has been dropped while paused.
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

    /// Returns the current scale multiplier.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.rx.borrow().scale
    }

    /// Sleeps between rounds, waking early only for cancellation.
    ///
    /// A pause signalled mid-sleep takes effect at the next round
    /// checkpoint rather than extending the sleep.
    ///
    /// # Errors
    ///
    /// Returns [`CancelRequested`] if cancellation arrives before the sleep
    /// completes.
    pub async fn sleep(&mut self, duration: Duration) -> Result<(), CancelRequested> {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            let state = self.rx.borrow_and_update().clone();
            if let Some(reason) = state.cancelled {
                return Err(CancelRequested { reason });
            }
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => return Ok(()),
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        // No handles left to cancel us; finish the sleep.
                        tokio::time::sleep_until(deadline).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Creates a connected control/gate pair for one supervisor.
#[must_use]
pub fn channel() -> (SupervisorControl, SupervisorGate) {
    let (tx, rx) = watch::channel(SupervisorState::default());
    (SupervisorControl { tx }, SupervisorGate { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scale_is_clamped_to_the_safe_range() {
        let (control, gate) = channel();

        control.scale(100.0);
        assert_eq!(gate.scale(), SCALE_MAX);

        control.scale(0.0);
        assert_eq!(gate.scale(), SCALE_MIN);

        control.scale(2.5);
        assert_eq!(gate.scale(), 2.5);
    }

    #[tokio::test]
    async fn status_reflects_signals() {
        let (control, _gate) = channel();

        control.pause();
        control.scale(3.0);
        let status = control.status();
        assert!(status.paused);
        assert!(!status.cancelled);
        assert_eq!(status.scale, 3.0);

        control.cancel("done");
        assert!(control.status().cancelled);
    }

    #[tokio::test]
    async fn cancel_interrupts_the_inter_round_sleep() {
        let (control, mut gate) = channel();

        let sleeper = tokio::spawn(async move {
            gate.sleep(Duration::from_secs(60)).await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        control.cancel("shutdown");
        let result = sleeper.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn pause_does_not_extend_the_sleep() {
        let (control, mut gate) = channel();

        control.pause();
        // Sleep completes despite the pause; the pause bites at the next
        // round checkpoint instead.
        gate.sleep(Duration::from_millis(5)).await.unwrap();
    }
}
