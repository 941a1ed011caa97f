//! Core domain types and utilities for the reelforge platform.
//!
//! This crate provides the foundational identifier types and error handling
//! shared by the orchestration crates (pipeline, batch supervisor, A/B
//! testing).

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{AbTestId, AccountId, BatchRunId, PipelineRunId};
