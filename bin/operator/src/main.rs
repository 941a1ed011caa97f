//! Batch supervisor operator.
//!
//! Wires the supervisor loop to a NATS-backed pipeline event log and runs it
//! against simulated activities — a development and smoke-test harness.
//! Production deployments substitute vendor-backed activity implementations
//! for the simulations.

mod config;

use crate::config::OperatorConfig;
use reelforge_activity::{SimulatedGeneration, SimulatedOps};
use reelforge_batch::Supervisor;
use reelforge_pipeline::PipelineEngine;
use reelforge_pipeline::nats::{NatsConfig, NatsEventStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let operator_config = OperatorConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let store = NatsEventStore::new(NatsConfig::new(&operator_config.nats_url))
        .await
        .expect("failed to connect to NATS");
    tracing::info!(url = %operator_config.nats_url, "Connected to event log");

    let latency = Duration::from_millis(operator_config.simulated_latency_ms);
    let activities = Arc::new(SimulatedGeneration::new(latency));
    let ops = Arc::new(SimulatedOps::new().with_latency(latency));

    let engine = PipelineEngine::new(store, activities);
    let (supervisor, control, metrics) =
        Supervisor::new(operator_config.batch, Arc::new(engine), ops);

    let supervisor_task = tokio::spawn(supervisor.run());

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");
    tracing::info!("Shutdown requested; cancelling supervisor");
    control.cancel("operator shutdown");

    let summary = supervisor_task.await.expect("supervisor task failed");
    let final_metrics = metrics.snapshot();
    tracing::info!(
        rounds = summary.rounds_completed,
        outputs = summary.outputs.len(),
        errors = summary.errors.len(),
        generated = final_metrics.total_generated,
        estimated_cost = final_metrics.estimated_cost,
        reason = %summary.stopped_reason,
        "Supervisor stopped"
    );
}
