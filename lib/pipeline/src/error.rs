//! Error types for the pipeline crate.
//!
//! Runner-internal failures are converted into failed `PipelineResult`s at
//! the top of the run, so callers always receive a structured outcome; these
//! types describe what went wrong on the way there.

use crate::progress::Stage;
use crate::replay::ReplayError;
use crate::store::EventStoreError;
use reelforge_activity::ActivityError;
use reelforge_core::PipelineRunId;
use std::fmt;

/// Errors that can occur while driving a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Event store operation failed.
    Store(EventStoreError),
    /// Event log could not be replayed.
    Replay(ReplayError),
    /// A stage's activity failed after exhausting its retries.
    Activity { stage: Stage, source: ActivityError },
    /// Resume was requested for a run with no events on record.
    RunNotFound { run_id: PipelineRunId },
    /// The run already has a terminal event on record.
    AlreadyTerminal { run_id: PipelineRunId },
    /// A stage was dispatched without its required input artifact or
    /// configuration.
    MissingStageInput { stage: Stage },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "event store error: {e}"),
            Self::Replay(e) => write!(f, "replay error: {e}"),
            Self::Activity { stage, source } => {
                write!(f, "stage {stage} failed: {source}")
            }
            Self::RunNotFound { run_id } => write!(f, "run not found: {run_id}"),
            Self::AlreadyTerminal { run_id } => {
                write!(f, "run already in terminal state: {run_id}")
            }
            Self::MissingStageInput { stage } => {
                write!(f, "stage {stage} is missing a required input")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<EventStoreError> for PipelineError {
    fn from(e: EventStoreError) -> Self {
        Self::Store(e)
    }
}

impl From<ReplayError> for PipelineError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}
