//! Run state reconstruction from events.
//!
//! The event log is the source of truth. After a crash, the run's state is
//! rebuilt by replaying its events in order: completed stages keep their
//! recorded artifacts and costs, and execution resumes at the first stage
//! without a completion on record. A stage that was started but never
//! completed is simply run again — only completed work is durable.

use crate::event::PipelineEvent;
use crate::input::PipelineInput;
use crate::progress::Stage;
use chrono::{DateTime, Utc};
use reelforge_core::PipelineRunId;

/// Recorded completion of a single stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedStage {
    /// Artifact the stage produced, if any.
    pub artifact: Option<String>,
    /// Cost recorded at the checkpoint.
    pub cost: f64,
    /// Activity time recorded at the checkpoint.
    pub duration_ms: u64,
}

/// Terminal outcome recorded in the log.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    /// Run completed all stages.
    Completed { total_cost: f64 },
    /// Run failed at a stage.
    Failed { stage: Stage, error: String },
    /// Run was cancelled.
    Cancelled { reason: String },
}

/// State of a run reconstructed from its event log.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayedRun {
    /// The run ID.
    pub run_id: PipelineRunId,
    /// The immutable input recorded at queue time.
    pub input: PipelineInput,
    /// When the run was queued.
    pub queued_at: DateTime<Utc>,
    /// Whether a `RunStarted` event is on record.
    pub started: bool,
    /// Terminal outcome, if the run already finished.
    pub terminal: Option<Terminal>,
    completed: Vec<(Stage, CompletedStage)>,
}

impl ReplayedRun {
    /// Creates the state of a brand-new run with no history.
    #[must_use]
    pub fn fresh(run_id: PipelineRunId, input: PipelineInput, queued_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            input,
            queued_at,
            started: true,
            terminal: None,
            completed: Vec::new(),
        }
    }

    /// Reconstructs run state from a sequence of events.
    ///
    /// Events must be provided in order (earliest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the event sequence is invalid (e.g., missing or
    /// duplicated `RunQueued`).
    pub fn from_events(
        events: impl IntoIterator<Item = PipelineEvent>,
    ) -> Result<Self, ReplayError> {
        let mut events_iter = events.into_iter();

        // First event must be RunQueued
        let first_event = events_iter.next().ok_or(ReplayError::NoEvents)?;
        let (run_id, input, queued_at) = match first_event {
            PipelineEvent::RunQueued {
                run_id,
                input,
                timestamp,
            } => (run_id, input, timestamp),
            _ => return Err(ReplayError::MissingRunQueued),
        };

        let mut state = Self {
            run_id,
            input,
            queued_at,
            started: false,
            terminal: None,
            completed: Vec::new(),
        };

        for event in events_iter {
            state.apply(event)?;
        }

        Ok(state)
    }

    fn apply(&mut self, event: PipelineEvent) -> Result<(), ReplayError> {
        match event {
            PipelineEvent::RunQueued { .. } => return Err(ReplayError::DuplicateRunQueued),
            PipelineEvent::RunStarted { .. } => self.started = true,
            // An in-flight stage without a completion leaves no durable
            // state; the stage re-runs on resume.
            PipelineEvent::StageStarted { .. } => {}
            PipelineEvent::StageCompleted {
                stage,
                artifact,
                cost,
                duration_ms,
                ..
            } => {
                self.completed.push((
                    stage,
                    CompletedStage {
                        artifact,
                        cost,
                        duration_ms,
                    },
                ));
            }
            PipelineEvent::RunCompleted { total_cost, .. } => {
                self.terminal = Some(Terminal::Completed { total_cost });
            }
            PipelineEvent::RunFailed { stage, error, .. } => {
                self.terminal = Some(Terminal::Failed { stage, error });
            }
            PipelineEvent::RunCancelled { reason, .. } => {
                self.terminal = Some(Terminal::Cancelled { reason });
            }
        }
        Ok(())
    }

    /// Returns the recorded completion for a stage, if any.
    #[must_use]
    pub fn completed_stage(&self, stage: Stage) -> Option<&CompletedStage> {
        self.completed
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, done)| done)
    }

    /// Returns true if the run already has a terminal event on record.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Returns the total cost recorded across completed stages.
    #[must_use]
    pub fn recorded_cost(&self) -> f64 {
        self.completed.iter().map(|(_, done)| done.cost).sum()
    }
}

/// Errors that can occur during run state reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// No events provided.
    NoEvents,
    /// First event was not `RunQueued`.
    MissingRunQueued,
    /// Duplicate `RunQueued` event.
    DuplicateRunQueued,
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoEvents => write!(f, "no events provided"),
            Self::MissingRunQueued => write!(f, "first event must be run_queued"),
            Self::DuplicateRunQueued => write!(f, "duplicate run_queued event"),
        }
    }
}

impl std::error::Error for ReplayError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued(run_id: PipelineRunId, t: DateTime<Utc>) -> PipelineEvent {
        PipelineEvent::RunQueued {
            run_id,
            input: PipelineInput::new("p1", "p2"),
            timestamp: t,
        }
    }

    #[test]
    fn replay_from_queued_only() {
        let run_id = PipelineRunId::new();
        let t = Utc::now();

        let state = ReplayedRun::from_events(vec![queued(run_id, t)]).unwrap();

        assert_eq!(state.run_id, run_id);
        assert!(!state.started);
        assert!(!state.is_terminal());
        assert!(state.completed_stage(Stage::GeneratingCharacter).is_none());
    }

    #[test]
    fn replay_partial_run_keeps_checkpointed_stage() {
        let run_id = PipelineRunId::new();
        let t = Utc::now();

        let events = vec![
            queued(run_id, t),
            PipelineEvent::RunStarted {
                run_id,
                timestamp: t,
            },
            PipelineEvent::StageStarted {
                run_id,
                stage: Stage::GeneratingCharacter,
                timestamp: t,
            },
            PipelineEvent::StageCompleted {
                run_id,
                stage: Stage::GeneratingCharacter,
                artifact: Some("c.png".to_string()),
                cost: 1.0,
                duration_ms: 90,
                timestamp: t,
            },
            // Video stage started but the process crashed before completion.
            PipelineEvent::StageStarted {
                run_id,
                stage: Stage::GeneratingVideo,
                timestamp: t,
            },
        ];

        let state = ReplayedRun::from_events(events).unwrap();

        assert!(state.started);
        let done = state.completed_stage(Stage::GeneratingCharacter).unwrap();
        assert_eq!(done.artifact.as_deref(), Some("c.png"));
        assert_eq!(done.cost, 1.0);
        // The interrupted video stage left nothing durable.
        assert!(state.completed_stage(Stage::GeneratingVideo).is_none());
        assert_eq!(state.recorded_cost(), 1.0);
    }

    #[test]
    fn replay_completed_run_is_terminal() {
        let run_id = PipelineRunId::new();
        let t = Utc::now();

        let events = vec![
            queued(run_id, t),
            PipelineEvent::RunStarted {
                run_id,
                timestamp: t,
            },
            PipelineEvent::RunCompleted {
                run_id,
                total_cost: 3.0,
                timestamp: t,
            },
        ];

        let state = ReplayedRun::from_events(events).unwrap();
        assert!(state.is_terminal());
        assert_eq!(
            state.terminal,
            Some(Terminal::Completed { total_cost: 3.0 })
        );
    }

    #[test]
    fn replay_cancelled_run_records_reason() {
        let run_id = PipelineRunId::new();
        let t = Utc::now();

        let events = vec![
            queued(run_id, t),
            PipelineEvent::RunCancelled {
                run_id,
                reason: "user request".to_string(),
                timestamp: t,
            },
        ];

        let state = ReplayedRun::from_events(events).unwrap();
        assert_eq!(
            state.terminal,
            Some(Terminal::Cancelled {
                reason: "user request".to_string()
            })
        );
    }

    #[test]
    fn error_on_no_events() {
        let result = ReplayedRun::from_events(Vec::new());
        assert!(matches!(result, Err(ReplayError::NoEvents)));
    }

    #[test]
    fn error_on_missing_run_queued() {
        let events = vec![PipelineEvent::RunStarted {
            run_id: PipelineRunId::new(),
            timestamp: Utc::now(),
        }];
        let result = ReplayedRun::from_events(events);
        assert!(matches!(result, Err(ReplayError::MissingRunQueued)));
    }

    #[test]
    fn error_on_duplicate_run_queued() {
        let run_id = PipelineRunId::new();
        let t = Utc::now();
        let result = ReplayedRun::from_events(vec![queued(run_id, t), queued(run_id, t)]);
        assert!(matches!(result, Err(ReplayError::DuplicateRunQueued)));
    }
}
