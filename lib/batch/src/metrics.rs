//! Instance-scoped aggregate metrics for a supervisor run.
//!
//! Each supervisor owns its own metrics cell — never a process-wide
//! singleton, since multiple supervisor instances may run concurrently.
//! Metrics accumulate for the life of the run and are never reset.

use reelforge_activity::PerformanceReport;
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Aggregate metrics for one supervisor run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchMetrics {
    /// Pipeline items generated successfully.
    pub total_generated: u64,
    /// Items whose performance has been measured.
    pub outcomes_measured: u64,
    /// Views observed across all measured items.
    pub total_views: u64,
    /// Items whose viral score exceeded the replication threshold.
    pub high_performers: u64,
    /// Running average engagement rate across measured items.
    pub avg_engagement: f64,
    /// Estimated spend, including failed attempts (they still bill).
    pub estimated_cost: f64,
    /// Estimated revenue from observed views.
    pub estimated_revenue: f64,
}

/// Read-only query handle over a supervisor's metrics.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    shared: Arc<RwLock<BatchMetrics>>,
}

impl MetricsHandle {
    /// Returns a point-in-time metrics snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BatchMetrics {
        self.shared.read().unwrap().clone()
    }
}

/// Write side of the metrics cell; owned by the supervisor loop.
#[derive(Debug)]
pub(crate) struct MetricsWriter {
    shared: Arc<RwLock<BatchMetrics>>,
}

impl MetricsWriter {
    /// Creates a fresh metrics cell and its read handle.
    pub(crate) fn new() -> (Self, MetricsHandle) {
        let shared = Arc::new(RwLock::new(BatchMetrics::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MetricsHandle { shared },
        )
    }

    /// Records a successfully generated item and its spend.
    pub(crate) fn record_generation(&self, cost: f64) {
        let mut metrics = self.shared.write().unwrap();
        metrics.total_generated += 1;
        metrics.estimated_cost += cost;
    }

    /// Records spend that produced no item (failed attempts still bill).
    pub(crate) fn record_spend(&self, cost: f64) {
        self.shared.write().unwrap().estimated_cost += cost;
    }

    /// Records a measured outcome; returns true if it cleared the
    /// high-performance threshold.
    pub(crate) fn record_outcome(
        &self,
        report: &PerformanceReport,
        viral_threshold: f64,
        revenue_per_mille: f64,
    ) -> bool {
        let mut metrics = self.shared.write().unwrap();
        metrics.outcomes_measured += 1;
        metrics.total_views += report.views;
        metrics.estimated_revenue += (report.views as f64 / 1000.0) * revenue_per_mille;

        // Incremental running average keeps the update O(1).
        let n = metrics.outcomes_measured as f64;
        metrics.avg_engagement += (report.engagement - metrics.avg_engagement) / n;

        let high = report.viral_score > viral_threshold;
        if high {
            metrics.high_performers += 1;
        }
        high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelforge_activity::Platform;

    fn report(views: u64, engagement: f64, viral_score: f64) -> PerformanceReport {
        PerformanceReport {
            views,
            engagement,
            viral_score,
            best_platform: Platform::Tiktok,
            url: "https://tiktok.example/post".to_string(),
        }
    }

    #[test]
    fn generation_accumulates_count_and_cost() {
        let (writer, handle) = MetricsWriter::new();
        writer.record_generation(1.5);
        writer.record_generation(2.0);

        let metrics = handle.snapshot();
        assert_eq!(metrics.total_generated, 2);
        assert_eq!(metrics.estimated_cost, 3.5);
    }

    #[test]
    fn failed_spend_counts_without_an_item() {
        let (writer, handle) = MetricsWriter::new();
        writer.record_spend(0.75);

        let metrics = handle.snapshot();
        assert_eq!(metrics.total_generated, 0);
        assert_eq!(metrics.estimated_cost, 0.75);
    }

    #[test]
    fn running_average_tracks_engagement() {
        let (writer, handle) = MetricsWriter::new();
        writer.record_outcome(&report(1000, 0.02, 10.0), 70.0, 1.0);
        writer.record_outcome(&report(1000, 0.06, 10.0), 70.0, 1.0);

        let metrics = handle.snapshot();
        assert!((metrics.avg_engagement - 0.04).abs() < 1e-9);
        assert_eq!(metrics.total_views, 2000);
        assert_eq!(metrics.estimated_revenue, 2.0);
    }

    #[test]
    fn high_performers_require_exceeding_the_threshold() {
        let (writer, handle) = MetricsWriter::new();
        assert!(!writer.record_outcome(&report(100, 0.01, 70.0), 70.0, 1.0));
        assert!(writer.record_outcome(&report(100, 0.01, 70.1), 70.0, 1.0));
        assert_eq!(handle.snapshot().high_performers, 1);
    }
}
