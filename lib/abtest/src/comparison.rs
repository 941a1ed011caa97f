//! Derived comparison over variant outcomes.
//!
//! Every ranking here is a pure function of the outcome set — fastest,
//! cheapest, best-value, and the weighted winner are recomputed from the
//! rows, never stored independently. Only successful rows participate;
//! ties go to the first-encountered variant.

use crate::variant::ModelVariant;
use reelforge_core::PipelineRunId;
use reelforge_pipeline::PipelineResult;
use serde::Serialize;

/// Metrics derived from a successful run, per second of output video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedMetrics {
    /// Cost per second of output.
    pub cost_per_second: f64,
    /// Generation time (ms) per second of output.
    pub ms_per_second: f64,
    /// Value score: total cost × total time in seconds; lower is better.
    pub value_score: f64,
}

impl DerivedMetrics {
    fn derive(result: &PipelineResult, duration_seconds: u32) -> Self {
        let unit = f64::from(duration_seconds.max(1));
        let time_seconds = result.total_duration_ms as f64 / 1000.0;
        Self {
            cost_per_second: result.total_cost / unit,
            ms_per_second: result.total_duration_ms as f64 / unit,
            value_score: result.total_cost * time_seconds,
        }
    }
}

/// One variant's outcome row in the comparison table.
///
/// Failed variants keep their row (with no derived metrics) so the table is
/// always complete.
#[derive(Debug, Clone, Serialize)]
pub struct VariantOutcome {
    /// The variant that produced this row.
    pub variant: ModelVariant,
    /// The run launched for it, allocated before launch for correlation.
    pub run_id: PipelineRunId,
    /// The run's terminal result.
    pub result: PipelineResult,
    /// Derived metrics; `None` for failed variants.
    pub metrics: Option<DerivedMetrics>,
}

impl VariantOutcome {
    /// Builds an outcome row, deriving metrics only on success.
    #[must_use]
    pub fn from_result(
        variant: ModelVariant,
        run_id: PipelineRunId,
        duration_seconds: u32,
        result: PipelineResult,
    ) -> Self {
        let metrics = result
            .success
            .then(|| DerivedMetrics::derive(&result, duration_seconds));
        Self {
            variant,
            run_id,
            result,
            metrics,
        }
    }
}

/// Weights for the composite winner score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    /// Weight on normalized cost.
    pub cost: f64,
    /// Weight on normalized time.
    pub time: f64,
    /// Weight on (inverted) normalized quality.
    pub quality: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            cost: 1.0,
            time: 1.0,
            quality: 1.0,
        }
    }
}

/// Scores the output quality of a successful variant run.
///
/// Pluggable because no automated visual-quality metric exists yet; the
/// shipped implementation is a constant placeholder.
pub trait QualityScorer: Send + Sync {
    /// Returns a quality score for the outcome; higher is better.
    fn score(&self, outcome: &VariantOutcome) -> f64;
}

/// Placeholder scorer returning a constant until a real visual-quality
/// metric lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantQuality(pub f64);

impl Default for ConstantQuality {
    fn default() -> Self {
        Self(0.5)
    }
}

impl QualityScorer for ConstantQuality {
    fn score(&self, _outcome: &VariantOutcome) -> f64 {
        self.0
    }
}

/// The derived ranking block of a comparison report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Variant with the lowest total time.
    pub fastest: String,
    /// Variant with the lowest total cost.
    pub cheapest: String,
    /// Variant with the lowest cost × time.
    pub best_value: String,
    /// Weighted winner over normalized cost/time/quality.
    pub winner: String,
}

impl Comparison {
    /// Derives the ranking from the outcome rows.
    ///
    /// Returns `None` when no variant succeeded — no meaningful comparison
    /// exists.
    #[must_use]
    pub fn derive(
        outcomes: &[VariantOutcome],
        weights: &ScoreWeights,
        quality: &dyn QualityScorer,
    ) -> Option<Self> {
        let successes: Vec<&VariantOutcome> =
            outcomes.iter().filter(|o| o.result.success).collect();
        if successes.is_empty() {
            return None;
        }

        let fastest = pick_min(&successes, |o| o.result.total_duration_ms as f64);
        let cheapest = pick_min(&successes, |o| o.result.total_cost);
        let best_value = pick_min(&successes, |o| {
            o.metrics.map_or(f64::INFINITY, |m| m.value_score)
        });

        let max_cost = fold_max(&successes, |o| o.result.total_cost);
        let max_time = fold_max(&successes, |o| o.result.total_duration_ms as f64);
        let qualities: Vec<f64> = successes.iter().map(|o| quality.score(o)).collect();
        let max_quality = qualities.iter().copied().fold(0.0_f64, f64::max);

        let mut winner = successes[0];
        let mut winner_score = f64::INFINITY;
        for (outcome, quality_score) in successes.iter().zip(&qualities) {
            let score = weights.cost * normalize(outcome.result.total_cost, max_cost)
                + weights.time * normalize(outcome.result.total_duration_ms as f64, max_time)
                + weights.quality * (1.0 - normalize(*quality_score, max_quality));
            if score < winner_score {
                winner = outcome;
                winner_score = score;
            }
        }

        Some(Self {
            fastest: fastest.variant.id.clone(),
            cheapest: cheapest.variant.id.clone(),
            best_value: best_value.variant.id.clone(),
            winner: winner.variant.id.clone(),
        })
    }
}

/// Strict less-than comparison keeps the first-encountered row on ties.
fn pick_min<'a>(
    outcomes: &[&'a VariantOutcome],
    key: impl Fn(&VariantOutcome) -> f64,
) -> &'a VariantOutcome {
    let mut best = outcomes[0];
    let mut best_key = key(best);
    for outcome in &outcomes[1..] {
        let candidate = key(outcome);
        if candidate < best_key {
            best = outcome;
            best_key = candidate;
        }
    }
    best
}

fn fold_max(outcomes: &[&VariantOutcome], key: impl Fn(&VariantOutcome) -> f64) -> f64 {
    outcomes.iter().map(|o| key(o)).fold(0.0_f64, f64::max)
}

fn normalize(value: f64, max: f64) -> f64 {
    if max > 0.0 { value / max } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::NodeKind;
    use reelforge_pipeline::{PipelineArtifacts, StageReport};
    use reelforge_pipeline::Stage;

    fn outcome(id: &str, cost: f64, duration_ms: u64) -> VariantOutcome {
        let run_id = PipelineRunId::new();
        let result = PipelineResult::completed(
            run_id,
            PipelineArtifacts {
                video_path: Some("v.mp4".to_string()),
                ..PipelineArtifacts::default()
            },
            vec![StageReport {
                stage: Stage::GeneratingVideo,
                cost,
                duration_ms,
            }],
            duration_ms,
        );
        VariantOutcome::from_result(
            ModelVariant::new(id, NodeKind::VideoGeneration, id),
            run_id,
            8,
            result,
        )
    }

    fn failed_outcome(id: &str) -> VariantOutcome {
        let run_id = PipelineRunId::new();
        VariantOutcome::from_result(
            ModelVariant::new(id, NodeKind::VideoGeneration, id),
            run_id,
            8,
            PipelineResult::failed(run_id, "scripted failure"),
        )
    }

    #[test]
    fn rankings_pick_the_expected_variants() {
        let outcomes = vec![
            outcome("slow-cheap", 1.0, 4_000),
            outcome("fast-pricey", 4.0, 1_000),
            outcome("balanced", 2.0, 1_500),
        ];

        let comparison = Comparison::derive(
            &outcomes,
            &ScoreWeights::default(),
            &ConstantQuality::default(),
        )
        .unwrap();

        assert_eq!(comparison.fastest, "fast-pricey");
        assert_eq!(comparison.cheapest, "slow-cheap");
        // Value scores: 4.0, 4.0, 3.0.
        assert_eq!(comparison.best_value, "balanced");
        // Normalized scores: 1.25, 1.25, 0.875 — balanced wins.
        assert_eq!(comparison.winner, "balanced");
    }

    #[test]
    fn value_tie_goes_to_the_first_encountered() {
        // 1.0 × 2s = 2.0 and 2.0 × 1s = 2.0.
        let outcomes = vec![outcome("modelA", 1.0, 2_000), outcome("modelB", 2.0, 1_000)];

        let comparison = Comparison::derive(
            &outcomes,
            &ScoreWeights::default(),
            &ConstantQuality::default(),
        )
        .unwrap();

        assert_eq!(comparison.best_value, "modelA");
    }

    #[test]
    fn failed_rows_are_excluded_from_rankings() {
        let outcomes = vec![
            failed_outcome("broken"),
            outcome("working", 2.0, 2_000),
        ];

        let comparison = Comparison::derive(
            &outcomes,
            &ScoreWeights::default(),
            &ConstantQuality::default(),
        )
        .unwrap();

        assert_eq!(comparison.fastest, "working");
        assert_eq!(comparison.winner, "working");
    }

    #[test]
    fn all_failures_yield_no_comparison() {
        let outcomes = vec![failed_outcome("a"), failed_outcome("b")];
        assert!(
            Comparison::derive(
                &outcomes,
                &ScoreWeights::default(),
                &ConstantQuality::default()
            )
            .is_none()
        );
    }

    #[test]
    fn failed_outcome_has_no_derived_metrics() {
        assert!(failed_outcome("x").metrics.is_none());
        assert!(outcome("y", 1.0, 1_000).metrics.is_some());
    }

    #[test]
    fn quality_weight_can_flip_the_winner() {
        struct PreferSlow;
        impl QualityScorer for PreferSlow {
            fn score(&self, outcome: &VariantOutcome) -> f64 {
                if outcome.variant.id == "slow-cheap" { 1.0 } else { 0.1 }
            }
        }

        let outcomes = vec![
            outcome("slow-cheap", 1.0, 4_000),
            outcome("balanced", 2.0, 1_500),
        ];

        let weights = ScoreWeights {
            cost: 0.1,
            time: 0.1,
            quality: 5.0,
        };
        let comparison = Comparison::derive(&outcomes, &weights, &PreferSlow).unwrap();
        assert_eq!(comparison.winner, "slow-cheap");
    }
}
