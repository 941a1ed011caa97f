//! The pipeline runner: a checkpointed, sequential stage machine.
//!
//! One runner task owns one run. Stages execute strictly in order because
//! each consumes the previous stage's artifact (video generation starts from
//! the character image) — the sequencing is a domain constraint, not an
//! implementation limit.
//!
//! Before each stage the runner observes the control gate: a pause suspends
//! it until resumed, a cancel converts into a clean failed result. After
//! each successful stage it appends a `StageCompleted` checkpoint before
//! moving on, so a crash-and-replay resumes without re-invoking completed
//! activities or double-counting their cost.

use crate::control::{self, CancelRequested, ControlGate, ControlHandle};
use crate::error::PipelineError;
use crate::event::{Envelope, PipelineEvent};
use crate::input::PipelineInput;
use crate::progress::{ProgressHandle, ProgressWriter, Stage};
use crate::replay::{CompletedStage, ReplayedRun};
use crate::result::{PipelineArtifacts, PipelineResult, StageReport};
use crate::store::EventStore;
use chrono::{DateTime, Utc};
use reelforge_activity::{
    ActivityInvoker, CharacterImageRequest, EnhanceRequest, GenerationActivities, VideoRequest,
};
use reelforge_core::PipelineRunId;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one executed stage.
struct StageOutcome {
    artifact: Option<String>,
    cost: f64,
    duration_ms: u64,
}

/// Returns the stages this input requires, in execution order.
fn planned_stages(input: &PipelineInput) -> Vec<Stage> {
    let mut stages = vec![Stage::GeneratingCharacter, Stage::GeneratingVideo];
    if input.enhance() {
        stages.push(Stage::Enhancing);
    }
    stages
}

fn elapsed_ms_since(queued_at: DateTime<Utc>) -> u64 {
    (Utc::now() - queued_at).num_milliseconds().max(0) as u64
}

/// Drives a single pipeline run to its terminal result.
pub struct PipelineRunner<E: EventStore, A: GenerationActivities> {
    run_id: PipelineRunId,
    input: Option<PipelineInput>,
    store: E,
    activities: Arc<A>,
    invoker: ActivityInvoker,
    gate: ControlGate,
    progress: ProgressWriter,
}

impl<E: EventStore, A: GenerationActivities> PipelineRunner<E, A> {
    /// Creates a runner along with the control and progress handles for it.
    ///
    /// `input` is required for a fresh run; pass `None` to resume a run
    /// whose input is already on record in the event log.
    #[must_use]
    pub fn new(
        run_id: PipelineRunId,
        input: Option<PipelineInput>,
        store: E,
        activities: Arc<A>,
        invoker: ActivityInvoker,
    ) -> (Self, ControlHandle, ProgressHandle) {
        let (control, gate) = control::channel();
        let (progress, progress_handle) = ProgressWriter::new();
        (
            Self {
                run_id,
                input,
                store,
                activities,
                invoker,
                gate,
                progress,
            },
            control,
            progress_handle,
        )
    }

    /// Runs the pipeline to completion, returning a structured result in
    /// every case — failures never propagate as panics or bare errors.
    pub async fn run(mut self) -> PipelineResult {
        let run_id = self.run_id;
        match self.execute().await {
            Ok(result) => result,
            Err(error) => {
                warn!(run_id = %run_id, error = %error, "pipeline run failed");
                self.progress.fail(error.to_string());
                PipelineResult::failed(run_id, error.to_string())
            }
        }
    }

    async fn execute(&mut self) -> Result<PipelineResult, PipelineError> {
        let replayed = self.prepare().await?;
        let input = replayed.input.clone();
        let queued_at = replayed.queued_at;
        let run_id = self.run_id;

        let mut artifacts = PipelineArtifacts::default();
        let mut stages: Vec<StageReport> = Vec::new();

        for stage in planned_stages(&input) {
            if let Some(done) = replayed.completed_stage(stage) {
                info!(run_id = %run_id, %stage, "stage already checkpointed; skipping");
                self.apply_checkpointed(stage, done, &input, &mut artifacts, &mut stages);
                continue;
            }

            if let Err(cancel) = self.gate.checkpoint().await {
                return self.cancel_run(queued_at, cancel, artifacts, stages).await;
            }

            self.append(PipelineEvent::StageStarted {
                run_id,
                stage,
                timestamp: Utc::now(),
            })
            .await?;
            self.progress.begin_stage(stage);
            info!(run_id = %run_id, %stage, "stage started");

            let outcome = match self.run_stage(stage, &input, &artifacts).await {
                Ok(outcome) => outcome,
                Err(PipelineError::Activity { stage, source }) => {
                    return self
                        .fail_run(queued_at, stage, source.to_string(), artifacts, stages)
                        .await;
                }
                Err(other) => return Err(other),
            };

            self.append(PipelineEvent::StageCompleted {
                run_id,
                stage,
                artifact: outcome.artifact.clone(),
                cost: outcome.cost,
                duration_ms: outcome.duration_ms,
                timestamp: Utc::now(),
            })
            .await?;
            self.progress.complete_stage(
                stage,
                outcome.artifact.as_deref(),
                outcome.cost,
                stage.completion_mark(input.enhance()),
            );
            record_artifact(stage, outcome.artifact.clone(), &mut artifacts);
            stages.push(StageReport {
                stage,
                cost: outcome.cost,
                duration_ms: outcome.duration_ms,
            });
            info!(run_id = %run_id, %stage, cost = outcome.cost, "stage completed");
        }

        let total_cost = stages.iter().map(|s| s.cost).sum();
        self.append(PipelineEvent::RunCompleted {
            run_id,
            total_cost,
            timestamp: Utc::now(),
        })
        .await?;
        self.progress.complete_run();
        info!(run_id = %run_id, total_cost, "run completed");

        Ok(PipelineResult::completed(
            run_id,
            artifacts,
            stages,
            elapsed_ms_since(queued_at),
        ))
    }

    /// Loads the run's history, or records the queue/start events for a
    /// fresh run.
    async fn prepare(&mut self) -> Result<ReplayedRun, PipelineError> {
        let run_id = self.run_id;
        let events = self.store.load(run_id).await?;

        if events.is_empty() {
            let input = self
                .input
                .take()
                .ok_or(PipelineError::RunNotFound { run_id })?;
            let now = Utc::now();
            self.append(PipelineEvent::RunQueued {
                run_id,
                input: input.clone(),
                timestamp: now,
            })
            .await?;
            self.append(PipelineEvent::RunStarted {
                run_id,
                timestamp: now,
            })
            .await?;
            return Ok(ReplayedRun::fresh(run_id, input, now));
        }

        let replayed = ReplayedRun::from_events(events)?;
        if replayed.is_terminal() {
            return Err(PipelineError::AlreadyTerminal { run_id });
        }
        if !replayed.started {
            self.append(PipelineEvent::RunStarted {
                run_id,
                timestamp: Utc::now(),
            })
            .await?;
        }
        info!(run_id = %run_id, recorded_cost = replayed.recorded_cost(), "resuming run from event log");
        Ok(replayed)
    }

    /// Applies a stage completion recovered from the event log.
    fn apply_checkpointed(
        &self,
        stage: Stage,
        done: &CompletedStage,
        input: &PipelineInput,
        artifacts: &mut PipelineArtifacts,
        stages: &mut Vec<StageReport>,
    ) {
        self.progress.complete_stage(
            stage,
            done.artifact.as_deref(),
            done.cost,
            stage.completion_mark(input.enhance()),
        );
        record_artifact(stage, done.artifact.clone(), artifacts);
        stages.push(StageReport {
            stage,
            cost: done.cost,
            duration_ms: done.duration_ms,
        });
    }

    async fn run_stage(
        &self,
        stage: Stage,
        input: &PipelineInput,
        artifacts: &PipelineArtifacts,
    ) -> Result<StageOutcome, PipelineError> {
        match stage {
            Stage::GeneratingCharacter => {
                let request = CharacterImageRequest {
                    prompt: input.character_prompt.clone(),
                    model: input.character_model.clone(),
                    temperature: input.temperature,
                    num_images: input.num_images,
                };
                let result = self
                    .invoker
                    .invoke("generate_character_image", |ctx| {
                        let activities = Arc::clone(&self.activities);
                        let request = request.clone();
                        async move { activities.generate_character_image(&ctx, request).await }
                    })
                    .await
                    .map_err(|source| PipelineError::Activity { stage, source })?;

                let artifact = result
                    .images
                    .first()
                    .cloned()
                    .ok_or(PipelineError::MissingStageInput { stage })?;
                Ok(StageOutcome {
                    artifact: Some(artifact),
                    cost: result.cost,
                    duration_ms: result.elapsed_ms,
                })
            }
            Stage::GeneratingVideo => {
                let first_frame = artifacts
                    .character_image
                    .clone()
                    .ok_or(PipelineError::MissingStageInput { stage })?;
                let request = VideoRequest {
                    prompt: input.video_prompt.clone(),
                    duration_seconds: input.duration_seconds,
                    aspect_ratio: input.aspect_ratio,
                    model: input.video_model.clone(),
                    first_frame,
                };
                let result = self
                    .invoker
                    .invoke("generate_video", |ctx| {
                        let activities = Arc::clone(&self.activities);
                        let request = request.clone();
                        async move { activities.generate_video(&ctx, request).await }
                    })
                    .await
                    .map_err(|source| PipelineError::Activity { stage, source })?;

                Ok(StageOutcome {
                    artifact: Some(result.video_path),
                    cost: result.cost,
                    duration_ms: result.elapsed_ms,
                })
            }
            Stage::Enhancing => {
                let video_path = artifacts
                    .video_path
                    .clone()
                    .ok_or(PipelineError::MissingStageInput { stage })?;
                let model = input
                    .enhance_model
                    .clone()
                    .ok_or(PipelineError::MissingStageInput { stage })?;
                let request = EnhanceRequest { video_path, model };
                let result = self
                    .invoker
                    .invoke("enhance_video", |ctx| {
                        let activities = Arc::clone(&self.activities);
                        let request = request.clone();
                        async move { activities.enhance_video(&ctx, request).await }
                    })
                    .await
                    .map_err(|source| PipelineError::Activity { stage, source })?;

                Ok(StageOutcome {
                    artifact: Some(result.enhanced_path),
                    cost: result.cost,
                    duration_ms: result.elapsed_ms,
                })
            }
            Stage::Initializing | Stage::Complete | Stage::Failed => {
                Err(PipelineError::MissingStageInput { stage })
            }
        }
    }

    async fn cancel_run(
        &mut self,
        queued_at: DateTime<Utc>,
        cancel: CancelRequested,
        artifacts: PipelineArtifacts,
        stages: Vec<StageReport>,
    ) -> Result<PipelineResult, PipelineError> {
        let run_id = self.run_id;
        info!(run_id = %run_id, reason = %cancel.reason, "run cancelled at checkpoint");
        self.append(PipelineEvent::RunCancelled {
            run_id,
            reason: cancel.reason.clone(),
            timestamp: Utc::now(),
        })
        .await?;

        let message = cancel.to_string();
        self.progress.fail(message.clone());
        Ok(PipelineResult::failed_with_stages(
            run_id,
            artifacts,
            stages,
            elapsed_ms_since(queued_at),
            message,
        ))
    }

    async fn fail_run(
        &mut self,
        queued_at: DateTime<Utc>,
        stage: Stage,
        error: String,
        artifacts: PipelineArtifacts,
        stages: Vec<StageReport>,
    ) -> Result<PipelineResult, PipelineError> {
        let run_id = self.run_id;
        warn!(run_id = %run_id, %stage, error = %error, "stage exhausted retries");
        self.append(PipelineEvent::RunFailed {
            run_id,
            stage,
            error: error.clone(),
            timestamp: Utc::now(),
        })
        .await?;

        self.progress.fail(error.clone());
        Ok(PipelineResult::failed_with_stages(
            run_id,
            artifacts,
            stages,
            elapsed_ms_since(queued_at),
            error,
        ))
    }

    async fn append(&self, event: PipelineEvent) -> Result<(), PipelineError> {
        self.store.append(Envelope::new(event)).await?;
        Ok(())
    }
}

fn record_artifact(stage: Stage, artifact: Option<String>, artifacts: &mut PipelineArtifacts) {
    match stage {
        Stage::GeneratingCharacter => artifacts.character_image = artifact,
        Stage::GeneratingVideo => artifacts.video_path = artifact,
        Stage::Enhancing => artifacts.enhanced_path = artifact,
        Stage::Initializing | Stage::Complete | Stage::Failed => {}
    }
}
