//! The A/B comparison runner.
//!
//! One pipeline run per variant, launched back-to-back with no artificial
//! staggering. Run IDs are allocated before launch and recorded on each
//! outcome row, so results stay correlated with their variants even under
//! concurrent execution. A variant's failure becomes a zero-metrics row;
//! only the all-variants-failed case is a hard error.

use crate::comparison::{Comparison, ConstantQuality, QualityScorer, ScoreWeights, VariantOutcome};
use crate::error::AbTestError;
use crate::template::PipelineTemplate;
use crate::variant::ModelVariant;
use futures::future::join_all;
use reelforge_core::{AbTestId, PipelineRunId};
use reelforge_pipeline::PipelineLauncher;
use std::sync::Arc;
use tracing::info;

/// Report for one completed comparison.
#[derive(Debug, Clone)]
pub struct AbTestReport {
    /// The comparison's ID.
    pub test_id: AbTestId,
    /// One row per variant, failures included.
    pub outcomes: Vec<VariantOutcome>,
    /// The derived ranking over the successful rows.
    pub comparison: Comparison,
}

/// Runs model comparisons over a pipeline launcher.
pub struct AbTestRunner<L: PipelineLauncher> {
    launcher: Arc<L>,
    weights: ScoreWeights,
    quality: Arc<dyn QualityScorer>,
}

impl<L: PipelineLauncher> AbTestRunner<L> {
    /// Creates a runner with equal weights and the placeholder quality
    /// scorer.
    #[must_use]
    pub fn new(launcher: Arc<L>) -> Self {
        Self {
            launcher,
            weights: ScoreWeights::default(),
            quality: Arc::new(ConstantQuality::default()),
        }
    }

    /// Sets the winner-score weights.
    #[must_use]
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Replaces the quality scorer.
    #[must_use]
    pub fn with_quality_scorer(mut self, quality: Arc<dyn QualityScorer>) -> Self {
        self.quality = quality;
        self
    }

    /// Runs one pipeline per variant against the base template and derives
    /// the comparison.
    ///
    /// # Errors
    ///
    /// Returns an error if no variants are supplied, the base template
    /// cannot be materialized, or every variant fails.
    pub async fn run(
        &self,
        base: &PipelineTemplate,
        variants: Vec<ModelVariant>,
    ) -> Result<AbTestReport, AbTestError> {
        if variants.is_empty() {
            return Err(AbTestError::NoVariants);
        }

        let test_id = AbTestId::new();

        // One deep-copied template per variant; run IDs allocated up front
        // so every row is correlated before anything launches.
        let mut launches = Vec::with_capacity(variants.len());
        for variant in variants {
            let mut template = base.clone();
            template.apply_variant(&variant);
            let input = template.to_input()?;
            launches.push((variant, PipelineRunId::new(), input));
        }

        info!(test_id = %test_id, variants = launches.len(), "starting model comparison");

        let results = join_all(
            launches
                .iter()
                .map(|(_, run_id, input)| self.launcher.launch(*run_id, input.clone())),
        )
        .await;

        let outcomes: Vec<VariantOutcome> = launches
            .into_iter()
            .zip(results)
            .map(|((variant, run_id, input), result)| {
                VariantOutcome::from_result(variant, run_id, input.duration_seconds, result)
            })
            .collect();

        let comparison = Comparison::derive(&outcomes, &self.weights, self.quality.as_ref())
            .ok_or(AbTestError::AllVariantsFailed {
                variants: outcomes.len(),
            })?;

        info!(
            test_id = %test_id,
            winner = %comparison.winner,
            best_value = %comparison.best_value,
            "comparison complete"
        );

        Ok(AbTestReport {
            test_id,
            outcomes,
            comparison,
        })
    }
}
