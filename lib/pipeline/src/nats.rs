//! NATS JetStream backend for the pipeline event log.
//!
//! Each run appends to its own subject (`pipeline.run.<run_id>`) inside a
//! shared stream, so replay is a filtered consumer over one subject. ULID
//! run IDs keep subjects unique across processes.

use crate::event::{Envelope, PipelineEvent};
use crate::store::{EventStore, EventStoreError};
use async_nats::jetstream;
use async_trait::async_trait;
use reelforge_core::PipelineRunId;
use std::sync::Arc;

/// Subject prefix for run events.
const RUN_EVENTS_SUBJECT_PREFIX: &str = "pipeline.run";

/// Default stream name for pipeline events.
const EVENTS_STREAM_NAME: &str = "PIPELINE_EVENTS";

/// Configuration for NATS-backed event persistence.
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URL.
    pub url: String,
    /// Stream name for events (defaults to PIPELINE_EVENTS).
    pub stream_name: Option<String>,
}

impl NatsConfig {
    /// Creates a new config with the given NATS URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream_name: None,
        }
    }

    fn stream(&self) -> &str {
        self.stream_name.as_deref().unwrap_or(EVENTS_STREAM_NAME)
    }
}

/// NATS JetStream-based event store.
///
/// Events are published to subjects like `pipeline.run.<run_id>`; each run
/// has its own subject for easy replay.
#[derive(Clone)]
pub struct NatsEventStore {
    jetstream: Arc<jetstream::Context>,
    config: NatsConfig,
}

impl NatsEventStore {
    /// Creates a new NATS event store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or stream setup fails.
    pub async fn new(config: NatsConfig) -> Result<Self, EventStoreError> {
        let client = async_nats::connect(&config.url).await.map_err(|e| {
            EventStoreError::ConnectionFailed {
                message: e.to_string(),
            }
        })?;

        let jetstream = async_nats::jetstream::new(client);

        // Ensure the stream exists
        let stream_config = jetstream::stream::Config {
            name: config.stream().to_string(),
            subjects: vec![format!("{RUN_EVENTS_SUBJECT_PREFIX}.>")],
            storage: jetstream::stream::StorageType::File,
            retention: jetstream::stream::RetentionPolicy::Limits,
            ..Default::default()
        };

        jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| EventStoreError::ConnectionFailed {
                message: format!("failed to create events stream: {e}"),
            })?;

        Ok(Self {
            jetstream: Arc::new(jetstream),
            config,
        })
    }

    /// Returns the subject for a run's events.
    fn run_subject(run_id: PipelineRunId) -> String {
        format!("{RUN_EVENTS_SUBJECT_PREFIX}.{run_id}")
    }
}

#[async_trait]
impl EventStore for NatsEventStore {
    async fn append(&self, event: Envelope<PipelineEvent>) -> Result<(), EventStoreError> {
        let subject = Self::run_subject(event.payload.run_id());
        let bytes = event
            .to_json_bytes()
            .map_err(|e| EventStoreError::AppendFailed {
                message: format!("failed to serialize event: {e}"),
            })?;

        self.jetstream
            .publish(subject, bytes.into())
            .await
            .map_err(|e| EventStoreError::AppendFailed {
                message: e.to_string(),
            })?
            .await
            .map_err(|e| EventStoreError::AppendFailed {
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn load(&self, run_id: PipelineRunId) -> Result<Vec<PipelineEvent>, EventStoreError> {
        let stream = self
            .jetstream
            .get_stream(self.config.stream())
            .await
            .map_err(|e| EventStoreError::LoadFailed {
                message: format!("failed to get stream: {e}"),
            })?;

        let subject = Self::run_subject(run_id);

        let consumer_config = jetstream::consumer::pull::Config {
            filter_subject: subject,
            deliver_policy: jetstream::consumer::DeliverPolicy::All,
            ..Default::default()
        };

        let consumer = stream.create_consumer(consumer_config).await.map_err(|e| {
            EventStoreError::LoadFailed {
                message: format!("failed to create consumer: {e}"),
            }
        })?;

        let mut events = Vec::new();
        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| EventStoreError::LoadFailed {
                message: format!("failed to get messages: {e}"),
            })?;

        use futures::StreamExt;
        while let Ok(Some(message)) =
            tokio::time::timeout(std::time::Duration::from_millis(100), messages.next()).await
        {
            let message = message.map_err(|e| EventStoreError::LoadFailed {
                message: e.to_string(),
            })?;

            let envelope: Envelope<PipelineEvent> = Envelope::from_json_bytes(&message.payload)
                .map_err(|e| EventStoreError::LoadFailed {
                    message: format!("failed to deserialize event: {e}"),
                })?;

            events.push(envelope.into_payload());

            message
                .ack()
                .await
                .map_err(|e| EventStoreError::LoadFailed {
                    message: format!("failed to ack message: {e}"),
                })?;
        }

        // Clean up the ephemeral consumer
        drop(messages);

        Ok(events)
    }
}
