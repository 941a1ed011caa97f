//! Terminal result of a pipeline run.

use crate::progress::Stage;
use reelforge_core::PipelineRunId;
use serde::{Deserialize, Serialize};

/// Per-stage cost and time breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// The stage this entry describes.
    pub stage: Stage,
    /// Cost billed for the stage's activity.
    pub cost: f64,
    /// Time the stage's activity took.
    pub duration_ms: u64,
}

/// Artifact locations produced by a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifacts {
    /// Character reference image.
    pub character_image: Option<String>,
    /// Generated video clip.
    pub video_path: Option<String>,
    /// Enhanced clip, when the enhancement stage ran.
    pub enhanced_path: Option<String>,
}

impl PipelineArtifacts {
    /// Returns the deliverable clip: the enhanced one if present, otherwise
    /// the raw generation.
    #[must_use]
    pub fn final_video(&self) -> Option<&str> {
        self.enhanced_path
            .as_deref()
            .or(self.video_path.as_deref())
    }
}

/// The immutable terminal value of a pipeline run.
///
/// Produced exactly once, at completion or failure. `total_cost` is always
/// the sum of the recorded stage costs — partial runs report exactly what
/// was spent up to the point of failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The run this result belongs to.
    pub run_id: PipelineRunId,
    /// Whether the run completed all stages.
    pub success: bool,
    /// Artifacts produced before termination.
    pub artifacts: PipelineArtifacts,
    /// Total cost across recorded stages.
    pub total_cost: f64,
    /// Wall-clock time from queueing to termination.
    pub total_duration_ms: u64,
    /// Per-stage breakdown.
    pub stages: Vec<StageReport>,
    /// Failure message, when `success` is false.
    pub error: Option<String>,
}

impl PipelineResult {
    /// Builds a successful result from the recorded stage reports.
    #[must_use]
    pub fn completed(
        run_id: PipelineRunId,
        artifacts: PipelineArtifacts,
        stages: Vec<StageReport>,
        total_duration_ms: u64,
    ) -> Self {
        let total_cost = stages.iter().map(|s| s.cost).sum();
        Self {
            run_id,
            success: true,
            artifacts,
            total_cost,
            total_duration_ms,
            stages,
            error: None,
        }
    }

    /// Builds a failed result that still accounts for the stages completed
    /// before the failure.
    #[must_use]
    pub fn failed_with_stages(
        run_id: PipelineRunId,
        artifacts: PipelineArtifacts,
        stages: Vec<StageReport>,
        total_duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        let total_cost = stages.iter().map(|s| s.cost).sum();
        Self {
            run_id,
            success: false,
            artifacts,
            total_cost,
            total_duration_ms,
            stages,
            error: Some(error.into()),
        }
    }

    /// Builds a zero-metrics failed result for a run that never recorded a
    /// checkpoint.
    #[must_use]
    pub fn failed(run_id: PipelineRunId, error: impl Into<String>) -> Self {
        Self::failed_with_stages(run_id, PipelineArtifacts::default(), Vec::new(), 0, error)
    }
}
