//! Supervisor configuration.

use reelforge_activity::Platform;
use reelforge_core::AccountId;
use serde::Deserialize;

/// A recurring character the batch generates content for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Persona {
    /// Display name, used in item labels and logs.
    pub name: String,
    /// Character description prompt.
    pub character_prompt: String,
}

/// A content series: a recurring video concept a persona appears in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentSeries {
    /// Display name, used in item labels and logs.
    pub name: String,
    /// Motion/scene prompt for the series.
    pub video_prompt: String,
}

/// Reference to an external platform account in the shared pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AccountRef {
    /// Platform the account posts to.
    pub platform: Platform,
    /// The account's ID.
    pub account_id: AccountId,
}

/// Outcome-driven replication policy.
///
/// The variation count divides the viral score by a fixed divisor — an
/// inherited heuristic with no principled derivation; treat both knobs as
/// tunable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplicationPolicy {
    /// Viral score a result must exceed to be replicated.
    #[serde(default = "default_viral_threshold")]
    pub viral_threshold: f64,
    /// Divisor mapping viral score to variation count.
    #[serde(default = "default_score_divisor")]
    pub score_divisor: f64,
}

fn default_viral_threshold() -> f64 {
    70.0
}

fn default_score_divisor() -> f64 {
    20.0
}

impl Default for ReplicationPolicy {
    fn default() -> Self {
        Self {
            viral_threshold: default_viral_threshold(),
            score_divisor: default_score_divisor(),
        }
    }
}

impl ReplicationPolicy {
    /// Returns how many variations to generate for a score, proportional to
    /// how far it climbed: `ceil(score / divisor)`.
    #[must_use]
    pub fn variation_count(&self, viral_score: f64) -> u32 {
        if self.score_divisor <= 0.0 || viral_score <= 0.0 {
            return 0;
        }
        (viral_score / self.score_divisor).ceil() as u32
    }
}

/// Configuration for one supervisor instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SupervisorConfig {
    /// Personas to generate for.
    #[serde(default)]
    pub personas: Vec<Persona>,
    /// Content series to draw prompts from.
    #[serde(default)]
    pub series: Vec<ContentSeries>,
    /// Platforms to target.
    #[serde(default)]
    pub platforms: Vec<Platform>,
    /// Account pool to health-check between rounds.
    #[serde(default)]
    pub accounts: Vec<AccountRef>,
    /// Items per round before the scale multiplier is applied.
    #[serde(default = "default_base_batch_size")]
    pub base_batch_size: u32,
    /// Items launched together; caps concurrent external load.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Attempts per item before its failure is recorded.
    #[serde(default = "default_item_retry_attempts")]
    pub item_retry_attempts: u32,
    /// Base delay between item attempts; grows linearly per attempt.
    #[serde(default = "default_item_retry_base_delay_ms")]
    pub item_retry_base_delay_ms: u64,
    /// Sleep between rounds.
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
    /// Whether to health-validate the account pool before each round.
    #[serde(default = "default_warmup")]
    pub warmup: bool,
    /// Replication policy for high performers.
    #[serde(default)]
    pub replication: ReplicationPolicy,
    /// Estimated revenue per thousand views.
    #[serde(default = "default_revenue_per_mille")]
    pub revenue_per_mille: f64,
}

fn default_base_batch_size() -> u32 {
    6
}

fn default_chunk_size() -> usize {
    10
}

fn default_item_retry_attempts() -> u32 {
    3
}

fn default_item_retry_base_delay_ms() -> u64 {
    5_000
}

fn default_inter_batch_delay_ms() -> u64 {
    600_000
}

fn default_warmup() -> bool {
    true
}

fn default_revenue_per_mille() -> f64 {
    0.9
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            personas: Vec::new(),
            series: Vec::new(),
            platforms: Vec::new(),
            accounts: Vec::new(),
            base_batch_size: default_base_batch_size(),
            chunk_size: default_chunk_size(),
            item_retry_attempts: default_item_retry_attempts(),
            item_retry_base_delay_ms: default_item_retry_base_delay_ms(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            warmup: default_warmup(),
            replication: ReplicationPolicy::default(),
            revenue_per_mille: default_revenue_per_mille(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variation_count_rounds_up() {
        let policy = ReplicationPolicy::default();
        assert_eq!(policy.variation_count(20.0), 1);
        assert_eq!(policy.variation_count(21.0), 2);
        assert_eq!(policy.variation_count(85.0), 5);
        assert_eq!(policy.variation_count(100.0), 5);
    }

    #[test]
    fn variation_count_guards_degenerate_inputs() {
        let policy = ReplicationPolicy {
            viral_threshold: 70.0,
            score_divisor: 0.0,
        };
        assert_eq!(policy.variation_count(85.0), 0);
        assert_eq!(ReplicationPolicy::default().variation_count(-5.0), 0);
    }

    #[test]
    fn config_defaults_deserialize_from_empty() {
        let config: SupervisorConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.item_retry_attempts, 3);
        assert!(config.warmup);
        assert_eq!(config.replication.viral_threshold, 70.0);
    }
}
