//! Start/resume surface for pipeline runs.
//!
//! The engine owns the event store, the activity implementations, and the
//! retry configuration; each `start` spawns one runner task and hands back a
//! [`PipelineHandle`] carrying the run's control and query handles. The
//! [`PipelineLauncher`] trait is the narrow seam the batch supervisor and
//! A/B runner consume: start one run, await its terminal result.

use crate::control::ControlHandle;
use crate::input::PipelineInput;
use crate::progress::ProgressHandle;
use crate::result::PipelineResult;
use crate::runner::PipelineRunner;
use crate::store::EventStore;
use async_trait::async_trait;
use reelforge_activity::{ActivityInvoker, GenerationActivities};
use reelforge_core::PipelineRunId;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Factory for pipeline runs over a shared store and activity set.
#[derive(Debug, Clone)]
pub struct PipelineEngine<E, A> {
    store: E,
    activities: Arc<A>,
    invoker: ActivityInvoker,
}

impl<E, A> PipelineEngine<E, A>
where
    E: EventStore + Clone + Send + Sync + 'static,
    A: GenerationActivities + Send + Sync + 'static,
{
    /// Creates an engine with the default retry configuration.
    #[must_use]
    pub fn new(store: E, activities: Arc<A>) -> Self {
        Self {
            store,
            activities,
            invoker: ActivityInvoker::default(),
        }
    }

    /// Replaces the activity invoker (retry policy and attempt timeout).
    #[must_use]
    pub fn with_invoker(mut self, invoker: ActivityInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    /// Starts a new run under a fresh run ID.
    #[must_use]
    pub fn start(&self, input: PipelineInput) -> PipelineHandle {
        self.spawn(PipelineRunId::new(), Some(input))
    }

    /// Starts a new run under a caller-chosen run ID, so the caller can
    /// correlate the result with its own records.
    #[must_use]
    pub fn start_with_id(&self, run_id: PipelineRunId, input: PipelineInput) -> PipelineHandle {
        self.spawn(run_id, Some(input))
    }

    /// Re-attaches to a run whose history is already in the event store,
    /// resuming from its last checkpoint.
    #[must_use]
    pub fn resume(&self, run_id: PipelineRunId) -> PipelineHandle {
        self.spawn(run_id, None)
    }

    fn spawn(&self, run_id: PipelineRunId, input: Option<PipelineInput>) -> PipelineHandle {
        let (runner, control, progress) = PipelineRunner::new(
            run_id,
            input,
            self.store.clone(),
            Arc::clone(&self.activities),
            self.invoker.clone(),
        );
        let task = tokio::spawn(runner.run());
        PipelineHandle {
            run_id,
            control,
            progress,
            task,
        }
    }
}

/// Handle to a spawned pipeline run.
#[derive(Debug)]
pub struct PipelineHandle {
    /// The run's ID.
    pub run_id: PipelineRunId,
    control: ControlHandle,
    progress: ProgressHandle,
    task: JoinHandle<PipelineResult>,
}

impl PipelineHandle {
    /// Returns the control handle for sending pause/resume/cancel signals.
    #[must_use]
    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    /// Returns the read-only progress query handle.
    #[must_use]
    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    /// Awaits the run's terminal result.
    ///
    /// A crashed runner task is reported as a failed result rather than a
    /// panic.
    pub async fn result(self) -> PipelineResult {
        let run_id = self.run_id;
        self.task
            .await
            .unwrap_or_else(|e| PipelineResult::failed(run_id, format!("runner task failed: {e}")))
    }
}

/// Start one run and await its terminal result.
///
/// The seam consumed by the batch supervisor and the A/B runner; mock
/// implementations stand in for the engine in their tests.
#[async_trait]
pub trait PipelineLauncher: Send + Sync {
    /// Launches a run under the given ID and awaits its result.
    async fn launch(&self, run_id: PipelineRunId, input: PipelineInput) -> PipelineResult;
}

#[async_trait]
impl<E, A> PipelineLauncher for PipelineEngine<E, A>
where
    E: EventStore + Clone + Send + Sync + 'static,
    A: GenerationActivities + Send + Sync + 'static,
{
    async fn launch(&self, run_id: PipelineRunId, input: PipelineInput) -> PipelineResult {
        self.start_with_id(run_id, input).result().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Stage;
    use crate::store::InMemoryEventStore;
    use reelforge_activity::{RetryPolicy, SimulatedGeneration};
    use std::time::Duration;

    fn engine(
        store: InMemoryEventStore,
        activities: Arc<SimulatedGeneration>,
    ) -> PipelineEngine<InMemoryEventStore, SimulatedGeneration> {
        PipelineEngine::new(store, activities).with_invoker(ActivityInvoker::new(RetryPolicy {
            initial_interval: Duration::from_millis(1),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_millis(4),
            max_attempts: 3,
        }))
    }

    #[tokio::test]
    async fn started_run_reaches_completion() {
        let engine = engine(
            InMemoryEventStore::new(),
            Arc::new(
                SimulatedGeneration::instant()
                    .with_image_cost(1.0)
                    .with_video_cost(2.0),
            ),
        );

        let handle = engine.start(PipelineInput::new("p1", "p2"));
        let result = handle.result().await;

        assert!(result.success);
        assert_eq!(result.total_cost, 3.0);
    }

    #[tokio::test]
    async fn pause_signal_holds_progress_until_resume() {
        let engine = engine(
            InMemoryEventStore::new(),
            Arc::new(SimulatedGeneration::instant()),
        );

        let handle = engine.start(PipelineInput::new("p1", "p2"));
        handle.control().pause();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.progress().status(), Stage::Initializing);

        handle.control().resume();
        let result = handle.result().await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn engine_resumes_a_crashed_run_from_its_store() {
        let store = InMemoryEventStore::new();
        let activities = Arc::new(
            SimulatedGeneration::instant()
                .with_image_cost(1.0)
                .with_video_cost(2.0),
        );

        // First process runs to completion against the shared store.
        let first = engine(store.clone(), Arc::clone(&activities));
        let handle = first.start(PipelineInput::new("p1", "p2"));
        let run_id = handle.run_id;
        let result = handle.result().await;
        assert!(result.success);

        // A resumed terminal run reports the terminal state instead of
        // re-running activities.
        let second = engine(store, activities);
        let resumed = second.resume(run_id).result().await;
        assert!(!resumed.success);
        assert!(resumed.error.as_deref().unwrap_or("").contains("terminal"));
    }

    #[tokio::test]
    async fn launcher_returns_the_terminal_result() {
        let engine = engine(
            InMemoryEventStore::new(),
            Arc::new(SimulatedGeneration::instant().with_video_cost(2.0)),
        );

        let run_id = PipelineRunId::new();
        let result = engine.launch(run_id, PipelineInput::new("p1", "p2")).await;

        assert!(result.success);
        assert_eq!(result.run_id, run_id);
    }
}
