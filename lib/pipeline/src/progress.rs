//! Run progress state and the query surface over it.
//!
//! Exactly one runner task owns the writer for a given run; everyone else
//! reads point-in-time snapshots through cloned [`ProgressHandle`]s. A
//! snapshot is always coherent: advancing normally, or frozen at
//! [`Stage::Failed`] with a populated error. Overall progress never
//! decreases, even across crash recovery.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

/// The stage a pipeline run is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Run accepted, no activity dispatched yet.
    Initializing,
    /// Generating the character reference image.
    GeneratingCharacter,
    /// Generating the video clip from the character image.
    GeneratingVideo,
    /// Enhancing the generated clip (optional stage).
    Enhancing,
    /// Run finished successfully.
    Complete,
    /// Run finished with a failure or cancellation.
    Failed,
}

impl Stage {
    /// Returns true if this is a terminal stage.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Returns the overall progress percentage reached once this stage
    /// completes. Weights shift when enhancement is enabled so the bar never
    /// jumps backwards between otherwise-identical runs.
    #[must_use]
    pub(crate) fn completion_mark(self, enhance: bool) -> u8 {
        match self {
            Self::Initializing => 5,
            Self::GeneratingCharacter => 40,
            Self::GeneratingVideo => {
                if enhance {
                    80
                } else {
                    100
                }
            }
            Self::Enhancing | Self::Complete => 100,
            Self::Failed => 0,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::GeneratingCharacter => write!(f, "generating_character"),
            Self::GeneratingVideo => write!(f, "generating_video"),
            Self::Enhancing => write!(f, "enhancing"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Point-in-time progress snapshot of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineProgress {
    /// Current stage.
    pub stage: Stage,
    /// Progress within the current stage (0-100).
    pub stage_progress: u8,
    /// Overall run progress (0-100); non-decreasing.
    pub overall_progress: u8,
    /// Character image path, once produced.
    pub character_image: Option<String>,
    /// Video clip path, once produced.
    pub video_path: Option<String>,
    /// Enhanced clip path, once produced.
    pub enhanced_path: Option<String>,
    /// Cost accumulated across completed stages.
    pub total_cost: f64,
    /// Failure message, populated only in the failed stage.
    pub error: Option<String>,
}

impl PipelineProgress {
    fn new() -> Self {
        Self {
            stage: Stage::Initializing,
            stage_progress: 0,
            overall_progress: 0,
            character_image: None,
            video_path: None,
            enhanced_path: None,
            total_cost: 0.0,
            error: None,
        }
    }
}

/// Read-only query handle over a run's progress.
///
/// Cheap to clone; safe to query at any time, including while an activity
/// is in flight. Callers must tolerate a snapshot showing a stage that is
/// about to change.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    shared: Arc<RwLock<PipelineProgress>>,
}

impl ProgressHandle {
    /// Returns the full progress snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PipelineProgress {
        self.shared.read().unwrap().clone()
    }

    /// Returns just the current stage.
    #[must_use]
    pub fn status(&self) -> Stage {
        self.shared.read().unwrap().stage
    }

    /// Returns the cost accumulated so far.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.shared.read().unwrap().total_cost
    }
}

/// Write side of a run's progress; owned exclusively by the runner task.
#[derive(Debug)]
pub(crate) struct ProgressWriter {
    shared: Arc<RwLock<PipelineProgress>>,
}

impl ProgressWriter {
    /// Creates a fresh progress cell and its read handle.
    pub(crate) fn new() -> (Self, ProgressHandle) {
        let shared = Arc::new(RwLock::new(PipelineProgress::new()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ProgressHandle { shared },
        )
    }

    /// Marks a stage as started.
    pub(crate) fn begin_stage(&self, stage: Stage) {
        let mut progress = self.shared.write().unwrap();
        progress.stage = stage;
        progress.stage_progress = 0;
    }

    /// Records a completed stage: artifact, cost, and the overall mark.
    pub(crate) fn complete_stage(
        &self,
        stage: Stage,
        artifact: Option<&str>,
        cost: f64,
        overall_mark: u8,
    ) {
        let mut progress = self.shared.write().unwrap();
        progress.stage = stage;
        progress.stage_progress = 100;
        progress.total_cost += cost;
        progress.overall_progress = progress.overall_progress.max(overall_mark);

        let artifact = artifact.map(str::to_string);
        match stage {
            Stage::GeneratingCharacter => progress.character_image = artifact,
            Stage::GeneratingVideo => progress.video_path = artifact,
            Stage::Enhancing => progress.enhanced_path = artifact,
            Stage::Initializing | Stage::Complete | Stage::Failed => {}
        }
    }

    /// Marks the run complete.
    pub(crate) fn complete_run(&self) {
        let mut progress = self.shared.write().unwrap();
        progress.stage = Stage::Complete;
        progress.stage_progress = 100;
        progress.overall_progress = 100;
    }

    /// Freezes progress at the failed stage with an error message.
    ///
    /// The rest of the snapshot is left at the last successful checkpoint.
    pub(crate) fn fail(&self, error: impl Into<String>) {
        let mut progress = self.shared.write().unwrap();
        progress.stage = Stage::Failed;
        progress.error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_progress_is_initializing() {
        let (_writer, handle) = ProgressWriter::new();
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.stage, Stage::Initializing);
        assert_eq!(snapshot.overall_progress, 0);
        assert_eq!(snapshot.total_cost, 0.0);
    }

    #[test]
    fn completed_stage_accumulates_cost_and_artifact() {
        let (writer, handle) = ProgressWriter::new();

        writer.begin_stage(Stage::GeneratingCharacter);
        writer.complete_stage(
            Stage::GeneratingCharacter,
            Some("character_01.png"),
            1.5,
            Stage::GeneratingCharacter.completion_mark(false),
        );

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.total_cost, 1.5);
        assert_eq!(snapshot.overall_progress, 40);
        assert_eq!(snapshot.character_image.as_deref(), Some("character_01.png"));
    }

    #[test]
    fn overall_progress_never_decreases() {
        let (writer, handle) = ProgressWriter::new();

        writer.complete_stage(Stage::GeneratingVideo, Some("v.mp4"), 1.0, 100);
        // A lower mark applied afterwards must not move the bar backwards.
        writer.complete_stage(Stage::GeneratingCharacter, Some("c.png"), 1.0, 40);

        assert_eq!(handle.snapshot().overall_progress, 100);
    }

    #[test]
    fn failure_freezes_last_checkpoint() {
        let (writer, handle) = ProgressWriter::new();

        writer.complete_stage(Stage::GeneratingCharacter, Some("c.png"), 2.0, 40);
        writer.fail("video generation exhausted retries");

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.stage, Stage::Failed);
        assert_eq!(snapshot.total_cost, 2.0);
        assert_eq!(snapshot.character_image.as_deref(), Some("c.png"));
        assert!(snapshot.error.is_some());
    }

    #[test]
    fn completion_marks_shift_with_enhancement() {
        assert_eq!(Stage::GeneratingVideo.completion_mark(false), 100);
        assert_eq!(Stage::GeneratingVideo.completion_mark(true), 80);
        assert_eq!(Stage::Enhancing.completion_mark(true), 100);
    }

    #[test]
    fn stage_terminality() {
        assert!(!Stage::Initializing.is_terminal());
        assert!(!Stage::GeneratingVideo.is_terminal());
        assert!(Stage::Complete.is_terminal());
        assert!(Stage::Failed.is_terminal());
    }
}
