//! Activity contracts for the reelforge platform.
//!
//! Activities are the boundary across which slow, externally billed,
//! retryable operations cross into deterministic orchestration logic:
//!
//! - **Contracts**: serializable request/result types and the
//!   `GenerationActivities`/`OpsActivities` traits
//! - **Errors**: transient vs. non-retryable vs. timed-out classification
//! - **Retry**: bounded exponential backoff around each activity call
//! - **Heartbeats**: per-attempt liveness windows for long-running work
//! - **Simulation**: configurable in-process implementations for tests and
//!   local development

pub mod contract;
pub mod error;
pub mod heartbeat;
pub mod retry;
pub mod simulation;

pub use contract::{
    AccountHealth, ActivityContext, AspectRatio, CharacterImageRequest, CharacterImageResult,
    DistributeRequest, Distribution, DistributionReport, EnhanceRequest, EnhanceResult,
    GenerationActivities, OpsActivities, PerformanceReport, Platform, VariationRequest,
    VariationResult, VideoRequest, VideoResult,
};
pub use error::ActivityError;
pub use heartbeat::HeartbeatHandle;
pub use retry::{ActivityInvoker, RetryPolicy};
pub use simulation::{FailurePlan, SimulatedGeneration, SimulatedOps};
