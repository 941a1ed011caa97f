//! Batch scheduling supervisor for the reelforge platform.
//!
//! An effectively-unbounded control loop that fans pipeline runs out across
//! configured personas × content series × platforms, measures every
//! distributed result, replicates the ones that perform, and keeps the
//! account pool healthy between rounds:
//!
//! - **Config**: personas, series, chunking, thresholds, retry pacing
//! - **Metrics**: instance-scoped aggregates, queryable at any time
//! - **Control**: pause/resume/cancel plus a clamped batch-scale signal
//! - **Supervisor**: the chunked fan-out loop itself

pub mod config;
pub mod control;
pub mod metrics;
pub mod supervisor;

pub use config::{AccountRef, ContentSeries, Persona, ReplicationPolicy, SupervisorConfig};
pub use control::{SupervisorControl, SupervisorStatus};
pub use metrics::{BatchMetrics, MetricsHandle};
pub use supervisor::{ItemError, Supervisor, SupervisorSummary};
