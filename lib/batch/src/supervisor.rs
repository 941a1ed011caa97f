//! The batch supervisor: an unbounded generate → distribute → measure loop.
//!
//! Each round fans the persona × series × platform cross-product out as
//! pipeline runs in fixed-size chunks, so chunking itself caps concurrent
//! external load. One item's failure never aborts its siblings or the loop;
//! it is retried with linearly increasing delays and, once exhausted,
//! recorded in the error list surfaced by the final summary.
//!
//! The loop runs until cancelled. Cancellation is observed at round
//! checkpoints and during the inter-round sleep, and converts into a
//! [`SupervisorSummary`] rather than an unhandled fault.

use crate::config::{ContentSeries, Persona, SupervisorConfig};
use crate::control::{self, SupervisorControl, SupervisorGate};
use crate::metrics::{BatchMetrics, MetricsHandle, MetricsWriter};
use futures::future::join_all;
use reelforge_activity::{
    ActivityInvoker, DistributeRequest, OpsActivities, Platform, VariationRequest,
};
use reelforge_core::{BatchRunId, PipelineRunId};
use reelforge_pipeline::{PipelineInput, PipelineLauncher};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A recorded item failure (or ops failure) from the supervisor loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    /// Label of the item or resource that failed.
    pub label: String,
    /// The final error after retries.
    pub error: String,
    /// Attempts made before giving up.
    pub attempts: u32,
}

/// Final summary produced when the supervisor is cancelled.
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorSummary {
    /// The supervisor run's ID.
    pub run_id: BatchRunId,
    /// Fully completed rounds.
    pub rounds_completed: u32,
    /// Metrics at the moment of cancellation.
    pub metrics: BatchMetrics,
    /// Paths of all produced content and variations.
    pub outputs: Vec<String>,
    /// Item and resource failures accumulated over the run.
    pub errors: Vec<ItemError>,
    /// Why the loop stopped.
    pub stopped_reason: String,
}

/// One scheduled generation: a persona in a series, for a platform.
struct WorkItem {
    label: String,
    platform: Platform,
    input: PipelineInput,
}

impl WorkItem {
    fn new(persona: &Persona, series: &ContentSeries, platform: Platform) -> Self {
        Self {
            label: format!("{}/{}/{platform}", persona.name, series.name),
            platform,
            input: PipelineInput::new(
                persona.character_prompt.clone(),
                series.video_prompt.clone(),
            )
            .with_platform(platform),
        }
    }
}

/// A generated item ready for distribution.
struct ItemSuccess {
    label: String,
    platform: Platform,
    content_path: String,
}

/// The supervisor control loop.
pub struct Supervisor<L: PipelineLauncher, O: OpsActivities> {
    run_id: BatchRunId,
    config: SupervisorConfig,
    launcher: Arc<L>,
    ops: Arc<O>,
    invoker: ActivityInvoker,
    gate: SupervisorGate,
    metrics: MetricsWriter,
    metrics_handle: MetricsHandle,
    outputs: Vec<String>,
    errors: Vec<ItemError>,
}

impl<L: PipelineLauncher, O: OpsActivities> Supervisor<L, O> {
    /// Creates a supervisor along with its control and metrics handles.
    #[must_use]
    pub fn new(
        config: SupervisorConfig,
        launcher: Arc<L>,
        ops: Arc<O>,
    ) -> (Self, SupervisorControl, MetricsHandle) {
        let (control, gate) = control::channel();
        let (metrics, metrics_handle) = MetricsWriter::new();
        (
            Self {
                run_id: BatchRunId::new(),
                config,
                launcher,
                ops,
                invoker: ActivityInvoker::default(),
                gate,
                metrics,
                metrics_handle: metrics_handle.clone(),
                outputs: Vec::new(),
                errors: Vec::new(),
            },
            control,
            metrics_handle,
        )
    }

    /// Replaces the invoker used for ops activities.
    #[must_use]
    pub fn with_invoker(mut self, invoker: ActivityInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    /// Runs rounds until cancelled, then returns the final summary.
    pub async fn run(mut self) -> SupervisorSummary {
        let run_id = self.run_id;
        info!(run_id = %run_id, "supervisor started");
        let mut rounds: u32 = 0;

        loop {
            if let Err(cancel) = self.gate.checkpoint().await {
                return self.summary(rounds, cancel.reason);
            }

            if rounds == 0 && self.config.warmup {
                self.check_accounts().await;
            }

            let scale = self.gate.scale();
            let batch_size =
                (f64::from(self.config.base_batch_size) * scale).round().max(0.0) as usize;
            let items = self.build_batch(batch_size);
            if items.is_empty() {
                debug!(run_id = %run_id, "nothing to schedule this round");
            }

            for chunk in items.chunks(self.config.chunk_size.max(1)) {
                let outcomes = join_all(chunk.iter().map(|item| self.run_item(item))).await;
                for outcome in outcomes {
                    match outcome {
                        Ok(success) => self.measure_and_replicate(success).await,
                        Err(error) => {
                            warn!(
                                run_id = %run_id,
                                item = %error.label,
                                error = %error.error,
                                "item exhausted retries"
                            );
                            self.errors.push(error);
                        }
                    }
                }
            }

            self.check_accounts().await;
            rounds += 1;
            info!(run_id = %run_id, rounds, "round completed");

            let delay = Duration::from_millis(self.config.inter_batch_delay_ms);
            if let Err(cancel) = self.gate.sleep(delay).await {
                return self.summary(rounds, cancel.reason);
            }
        }
    }

    /// Builds one round's items by cycling the cross-product up to the
    /// requested size.
    fn build_batch(&self, size: usize) -> Vec<WorkItem> {
        let mut combos = Vec::new();
        for persona in &self.config.personas {
            for series in &self.config.series {
                for platform in &self.config.platforms {
                    combos.push((persona, series, *platform));
                }
            }
        }
        if combos.is_empty() {
            return Vec::new();
        }

        (0..size)
            .map(|i| {
                let (persona, series, platform) = combos[i % combos.len()];
                WorkItem::new(persona, series, platform)
            })
            .collect()
    }

    /// Generates one item, retrying with linearly increasing delays.
    async fn run_item(&self, item: &WorkItem) -> Result<ItemSuccess, ItemError> {
        let attempts = self.config.item_retry_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let run_id = PipelineRunId::new();
            let result = self.launcher.launch(run_id, item.input.clone()).await;

            if result.success {
                if let Some(path) = result.artifacts.final_video() {
                    self.metrics.record_generation(result.total_cost);
                    return Ok(ItemSuccess {
                        label: item.label.clone(),
                        platform: item.platform,
                        content_path: path.to_string(),
                    });
                }
                last_error = "pipeline succeeded without an output artifact".to_string();
            } else {
                last_error = result
                    .error
                    .unwrap_or_else(|| "pipeline failed".to_string());
            }
            // Failed attempts still spent money; account for them.
            self.metrics.record_spend(result.total_cost);
            warn!(item = %item.label, attempt, error = %last_error, "item attempt failed");

            if attempt < attempts {
                let delay = Duration::from_millis(
                    self.config.item_retry_base_delay_ms * u64::from(attempt),
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(ItemError {
            label: item.label.clone(),
            error: last_error,
            attempts,
        })
    }

    /// Distributes a generated item, measures it, and replicates it if it
    /// cleared the threshold.
    async fn measure_and_replicate(&mut self, success: ItemSuccess) {
        self.outputs.push(success.content_path.clone());

        let distribution = self
            .invoker
            .invoke("distribute_content", |ctx| {
                let ops = Arc::clone(&self.ops);
                let request = DistributeRequest {
                    content_path: success.content_path.clone(),
                    platforms: vec![success.platform],
                };
                async move { ops.distribute_content(&ctx, request).await }
            })
            .await;

        let distribution = match distribution {
            Ok(report) => report,
            Err(error) => {
                self.errors.push(ItemError {
                    label: success.label.clone(),
                    error: format!("distribution failed: {error}"),
                    attempts: self.invoker.policy().max_attempts,
                });
                return;
            }
        };

        let content_id = distribution
            .distributions
            .first()
            .map(|d| d.post_id.clone())
            .unwrap_or_else(|| success.content_path.clone());

        let performance = self
            .invoker
            .invoke("analyze_performance", |ctx| {
                let ops = Arc::clone(&self.ops);
                let content_id = content_id.clone();
                let platform = success.platform;
                async move { ops.analyze_performance(&ctx, &content_id, platform).await }
            })
            .await;

        let performance = match performance {
            Ok(report) => report,
            Err(error) => {
                self.errors.push(ItemError {
                    label: success.label.clone(),
                    error: format!("performance analysis failed: {error}"),
                    attempts: self.invoker.policy().max_attempts,
                });
                return;
            }
        };

        let high_performer = self.metrics.record_outcome(
            &performance,
            self.config.replication.viral_threshold,
            self.config.revenue_per_mille,
        );
        if high_performer {
            self.replicate(&success, performance.viral_score).await;
        }
    }

    /// Spawns variation generations proportional to how far the score
    /// exceeded the threshold.
    async fn replicate(&mut self, success: &ItemSuccess, viral_score: f64) {
        let count = self.config.replication.variation_count(viral_score);
        if count == 0 {
            return;
        }
        info!(item = %success.label, viral_score, count, "replicating high performer");

        let request = VariationRequest {
            source_path: success.content_path.clone(),
            count,
        };
        let result = self
            .invoker
            .invoke("generate_variations", |ctx| {
                let ops = Arc::clone(&self.ops);
                let request = request.clone();
                async move { ops.generate_variations(&ctx, request).await }
            })
            .await;

        match result {
            Ok(variations) => {
                self.metrics.record_spend(variations.cost);
                self.outputs.extend(variations.variation_paths);
            }
            Err(error) => self.errors.push(ItemError {
                label: success.label.clone(),
                error: format!("replication failed: {error}"),
                attempts: self.invoker.policy().max_attempts,
            }),
        }
    }

    /// Health-checks every configured account, rotating the unhealthy ones
    /// through the dedicated activity.
    async fn check_accounts(&mut self) {
        let accounts = self.config.accounts.clone();
        for account in accounts {
            let label = format!("account {}:{}", account.platform, account.account_id);

            let health = self
                .invoker
                .invoke("check_account_health", |ctx| {
                    let ops = Arc::clone(&self.ops);
                    async move {
                        ops.check_account_health(&ctx, account.platform, account.account_id)
                            .await
                    }
                })
                .await;

            match health {
                Ok(health) if health.needs_rotation => {
                    info!(account = %label, "rotating unhealthy account");
                    let rotated = self
                        .invoker
                        .invoke("rotate_proxy", |ctx| {
                            let ops = Arc::clone(&self.ops);
                            async move {
                                ops.rotate_proxy(&ctx, account.platform, account.account_id)
                                    .await
                            }
                        })
                        .await;
                    if let Err(error) = rotated {
                        self.errors.push(ItemError {
                            label,
                            error: format!("rotation failed: {error}"),
                            attempts: self.invoker.policy().max_attempts,
                        });
                    }
                }
                Ok(_) => {}
                Err(error) => self.errors.push(ItemError {
                    label,
                    error: format!("health check failed: {error}"),
                    attempts: self.invoker.policy().max_attempts,
                }),
            }
        }
    }

    fn summary(self, rounds: u32, reason: String) -> SupervisorSummary {
        info!(
            run_id = %self.run_id,
            rounds,
            outputs = self.outputs.len(),
            errors = self.errors.len(),
            reason = %reason,
            "supervisor stopped"
        );
        SupervisorSummary {
            run_id: self.run_id,
            rounds_completed: rounds,
            metrics: self.metrics_handle.snapshot(),
            outputs: self.outputs,
            errors: self.errors,
            stopped_reason: reason,
        }
    }
}
