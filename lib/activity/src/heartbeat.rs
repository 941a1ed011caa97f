//! Heartbeat-aware liveness windows for activity attempts.
//!
//! An activity whose external operation can outlast the configured attempt
//! timeout must periodically record a heartbeat. The invoker treats the
//! timeout as a sliding window anchored at the last heartbeat: an attempt
//! that keeps beating keeps running, an attempt that goes silent for a full
//! window is killed and classified as timed out.

use crate::error::ActivityError;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Shared liveness marker for one activity attempt.
///
/// Cloned into the [`crate::contract::ActivityContext`] handed to the
/// activity; the invoker keeps its own clone to compute deadlines.
#[derive(Debug, Clone)]
pub struct HeartbeatHandle {
    last_beat: Arc<Mutex<Instant>>,
}

impl HeartbeatHandle {
    /// Creates a handle with the liveness window starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_beat: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Records liveness, restarting the timeout window.
    pub fn beat(&self) {
        *self.last_beat.lock().unwrap() = Instant::now();
    }

    /// Returns the instant at which the attempt times out, given a window.
    fn deadline(&self, window: Duration) -> Instant {
        *self.last_beat.lock().unwrap() + window
    }
}

impl Default for HeartbeatHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives an activity future under a heartbeat-extended timeout window.
///
/// Returns the activity's own result if it finishes in time, or
/// [`ActivityError::Timeout`] once a full window elapses without a beat.
pub async fn run_with_liveness<T>(
    window: Duration,
    handle: HeartbeatHandle,
    fut: impl Future<Output = Result<T, ActivityError>>,
) -> Result<T, ActivityError> {
    let started = Instant::now();
    tokio::pin!(fut);

    loop {
        let deadline = handle.deadline(window);
        tokio::select! {
            result = &mut fut => return result,
            () = tokio::time::sleep_until(deadline) => {
                // A beat may have landed while we were sleeping; only give
                // up if the window is genuinely exhausted.
                if handle.deadline(window) <= Instant::now() {
                    return Err(ActivityError::Timeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_activity_completes_within_window() {
        let handle = HeartbeatHandle::new();
        let result =
            run_with_liveness(Duration::from_millis(50), handle, async { Ok::<_, ActivityError>(7) })
                .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn silent_activity_times_out() {
        let handle = HeartbeatHandle::new();
        let result = run_with_liveness(Duration::from_millis(10), handle, async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, ActivityError>(())
        })
        .await;

        assert!(matches!(result, Err(ActivityError::Timeout { .. })));
    }

    #[tokio::test]
    async fn heartbeats_extend_the_window() {
        let handle = HeartbeatHandle::new();
        let beater = handle.clone();

        // Runs well past the 20ms window, but beats every 5ms.
        let result = run_with_liveness(Duration::from_millis(20), handle, async move {
            for _ in 0..12 {
                tokio::time::sleep(Duration::from_millis(5)).await;
                beater.beat();
            }
            Ok::<_, ActivityError>("done")
        })
        .await;

        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn activity_error_passes_through() {
        let handle = HeartbeatHandle::new();
        let result = run_with_liveness(Duration::from_millis(50), handle, async {
            Err::<(), _>(ActivityError::transient("upstream 503"))
        })
        .await;

        assert!(matches!(result, Err(ActivityError::Transient { .. })));
    }
}
