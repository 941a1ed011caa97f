//! Durable single-run generation pipeline for the reelforge platform.
//!
//! This crate provides the checkpointed character → video → enhancement
//! pipeline, including:
//!
//! - **Input/Result**: immutable run configuration and terminal outcome
//! - **Events**: the append-only checkpoint log each run persists
//! - **Replay**: state reconstruction for crash recovery and resumption
//! - **Store**: the event-log seam with in-memory and NATS JetStream backends
//! - **Control**: cooperative pause/resume/cancel signals
//! - **Progress**: side-effect-free snapshot queries of a running instance
//! - **Engine**: the start/resume surface and the launcher seam consumed by
//!   the batch supervisor and A/B runner

pub mod control;
pub mod engine;
pub mod error;
pub mod event;
pub mod input;
pub mod nats;
pub mod progress;
pub mod replay;
pub mod result;
pub mod runner;
pub mod store;

pub use control::{CancelRequested, ControlHandle};
pub use engine::{PipelineEngine, PipelineHandle, PipelineLauncher};
pub use error::PipelineError;
pub use event::{Envelope, PipelineEvent};
pub use input::PipelineInput;
pub use progress::{PipelineProgress, ProgressHandle, Stage};
pub use replay::ReplayedRun;
pub use result::{PipelineArtifacts, PipelineResult, StageReport};
pub use runner::PipelineRunner;
pub use store::{EventStore, EventStoreError, InMemoryEventStore};
