//! Config loading for the admin consumer.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::ControllerRole;
use crate::core::ClusterName;
use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub cluster: ClusterName,
    pub role: ControllerRole,
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

impl Config {
    pub fn new(cluster: ClusterName, role: ControllerRole) -> Self {
        Self {
            cluster,
            role,
            consumer: ConsumerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Fixed worker pool size; at least 1.
    pub worker_pool_size: usize,
    /// Max records per tailer poll.
    pub poll_batch_size: usize,
    /// Tailer poll timeout when the log is caught up.
    pub poll_interval_ms: u64,
    /// Coordinator scheduling tick.
    pub cycle_interval_ms: u64,
    /// Cadence of durable offset checkpoints.
    pub checkpoint_interval_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 4,
            poll_batch_size: 100,
            poll_interval_ms: 200,
            cycle_interval_ms: 20,
            checkpoint_interval_ms: 5_000,
            backoff_base_ms: 250,
            backoff_max_ms: 5_000,
        }
    }
}

pub fn load(path: &Path) -> Result<Config, Error> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            cluster = "cluster0"
            role = "Child"
            "#,
        )
        .unwrap();
        assert_eq!(config.cluster.as_str(), "cluster0");
        assert_eq!(config.role, ControllerRole::Child);
        assert_eq!(config.consumer.worker_pool_size, 4);
    }

    #[test]
    fn overrides_consumer_tunables() {
        let config: Config = toml::from_str(
            r#"
            cluster = "cluster0"
            role = "Parent"

            [consumer]
            worker_pool_size = 8
            checkpoint_interval_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.consumer.worker_pool_size, 8);
        assert_eq!(config.consumer.checkpoint_interval_ms, 1_000);
        assert_eq!(config.consumer.backoff_base_ms, 250);
    }
}
