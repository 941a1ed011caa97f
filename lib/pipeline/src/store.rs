//! Event-log persistence seam.
//!
//! The store abstraction allows the runner to be tested without NATS while
//! still supporting the JetStream implementation in production (see
//! [`crate::nats`]).

use crate::event::{Envelope, PipelineEvent};
use async_trait::async_trait;
use reelforge_core::PipelineRunId;
use std::sync::{Arc, Mutex};

/// Trait for appending and replaying a run's checkpoint events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends an event to the run's log.
    async fn append(&self, event: Envelope<PipelineEvent>) -> Result<(), EventStoreError>;

    /// Loads all events for a run, earliest first.
    async fn load(&self, run_id: PipelineRunId) -> Result<Vec<PipelineEvent>, EventStoreError>;
}

/// Errors from event store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStoreError {
    /// Failed to connect to the event store.
    ConnectionFailed { message: String },
    /// Failed to append an event.
    AppendFailed { message: String },
    /// Failed to load events.
    LoadFailed { message: String },
}

impl std::fmt::Display for EventStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed { message } => {
                write!(f, "event store connection failed: {message}")
            }
            Self::AppendFailed { message } => write!(f, "event append failed: {message}"),
            Self::LoadFailed { message } => write!(f, "event load failed: {message}"),
        }
    }
}

impl std::error::Error for EventStoreError {}

/// In-memory event store for tests and local development.
///
/// Clones share the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<Mutex<Vec<Envelope<PipelineEvent>>>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events for a run (test/inspection helper).
    #[must_use]
    pub fn events_for(&self, run_id: PipelineRunId) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.payload.run_id() == run_id)
            .map(|e| e.payload.clone())
            .collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: Envelope<PipelineEvent>) -> Result<(), EventStoreError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn load(&self, run_id: PipelineRunId) -> Result<Vec<PipelineEvent>, EventStoreError> {
        Ok(self.events_for(run_id))
    }
}
