//! Checkpoint events for pipeline runs.
//!
//! The event log is the source of truth for run state: every stage boundary
//! appends an event before execution moves on, and crash recovery replays
//! the log to pick up exactly where the run left off. Persisted bytes are
//! wrapped in a versioned envelope to leave room for schema evolution.

use crate::input::PipelineInput;
use crate::progress::Stage;
use chrono::{DateTime, Utc};
use reelforge_core::PipelineRunId;
use serde::{Deserialize, Serialize};

/// The current envelope version.
pub const CURRENT_VERSION: u32 = 1;

/// A versioned envelope wrapping persisted event data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The version of the envelope format.
    pub version: u32,
    /// The wrapped payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope with the current version.
    #[must_use]
    pub fn new(payload: T) -> Self {
        Self {
            version: CURRENT_VERSION,
            payload,
        }
    }

    /// Unwraps the envelope, returning the payload.
    #[must_use]
    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serializes the envelope to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl<T: for<'de> Deserialize<'de>> Envelope<T> {
    /// Deserializes an envelope from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Events recorded over the life of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Run was accepted; records the immutable input.
    RunQueued {
        run_id: PipelineRunId,
        input: PipelineInput,
        timestamp: DateTime<Utc>,
    },
    /// Run began executing.
    RunStarted {
        run_id: PipelineRunId,
        timestamp: DateTime<Utc>,
    },
    /// A stage's activity was dispatched.
    StageStarted {
        run_id: PipelineRunId,
        stage: Stage,
        timestamp: DateTime<Utc>,
    },
    /// A stage's activity succeeded; the checkpoint that makes the stage
    /// durable. Replay never re-runs a stage with this event on record.
    StageCompleted {
        run_id: PipelineRunId,
        stage: Stage,
        artifact: Option<String>,
        cost: f64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// Run finished successfully.
    RunCompleted {
        run_id: PipelineRunId,
        total_cost: f64,
        timestamp: DateTime<Utc>,
    },
    /// Run failed after exhausting a stage's retries.
    RunFailed {
        run_id: PipelineRunId,
        stage: Stage,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// Run was cancelled at a checkpoint.
    RunCancelled {
        run_id: PipelineRunId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Returns the run ID associated with this event.
    #[must_use]
    pub fn run_id(&self) -> PipelineRunId {
        match self {
            Self::RunQueued { run_id, .. }
            | Self::RunStarted { run_id, .. }
            | Self::StageStarted { run_id, .. }
            | Self::StageCompleted { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. }
            | Self::RunCancelled { run_id, .. } => *run_id,
        }
    }

    /// Returns the timestamp of this event.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::RunQueued { timestamp, .. }
            | Self::RunStarted { timestamp, .. }
            | Self::StageStarted { timestamp, .. }
            | Self::StageCompleted { timestamp, .. }
            | Self::RunCompleted { timestamp, .. }
            | Self::RunFailed { timestamp, .. }
            | Self::RunCancelled { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_current_version() {
        let event = PipelineEvent::RunStarted {
            run_id: PipelineRunId::new(),
            timestamp: Utc::now(),
        };
        let envelope = Envelope::new(event);
        assert_eq!(envelope.version, CURRENT_VERSION);
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = PipelineEvent::StageCompleted {
            run_id: PipelineRunId::new(),
            stage: Stage::GeneratingVideo,
            artifact: Some("video_01.mp4".to_string()),
            cost: 1.25,
            duration_ms: 84_000,
            timestamp: Utc::now(),
        };

        let bytes = Envelope::new(event.clone()).to_json_bytes().expect("serialize");
        let parsed: Envelope<PipelineEvent> =
            Envelope::from_json_bytes(&bytes).expect("deserialize");

        assert_eq!(parsed.into_payload().run_id(), event.run_id());
    }

    #[test]
    fn event_json_uses_snake_case_tags() {
        let event = PipelineEvent::RunCancelled {
            run_id: PipelineRunId::new(),
            reason: "operator shutdown".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).expect("to_value");
        assert_eq!(json["type"], "run_cancelled");
    }
}
