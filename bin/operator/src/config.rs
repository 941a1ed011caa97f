//! Centralized operator configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate: an optional
//! `reelforge.toml` file layered under environment variables (using `__` as
//! the nesting separator, e.g. `BATCH__CHUNK_SIZE=5`).

use reelforge_batch::SupervisorConfig;
use serde::Deserialize;

/// Operator configuration.
#[derive(Debug, Deserialize)]
pub struct OperatorConfig {
    /// NATS server URL for the pipeline event log.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Latency applied to each simulated activity call.
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,

    /// Batch supervisor configuration.
    #[serde(default)]
    pub batch: SupervisorConfig,
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_simulated_latency_ms() -> u64 {
    250
}

impl OperatorConfig {
    /// Loads configuration from `reelforge.toml` (if present) and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is malformed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("reelforge").required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_nats() {
        let config: OperatorConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert_eq!(config.simulated_latency_ms, 250);
    }
}
