use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::feed::{Backoff, SyntheticTiming};

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub stream: StreamConfig,
    pub metrics: MetricsConfig,
    pub synthetic: SyntheticConfig,
    pub graph: GraphConfig,
    pub render: RenderConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub base_url: String,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
    pub demo: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            reconnect_base_ms: 2_000,
            reconnect_max_ms: 30_000,
            demo: false,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api/neural-feed".to_string()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub poll_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyntheticConfig {
    pub first_delay_ms: u64,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            first_delay_ms: 1_500,
            min_interval_ms: 3_000,
            max_interval_ms: 9_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    pub max_leaf_nodes: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_leaf_nodes: crate::app::MAX_LEAF_NODES,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Seed for every random draw (jitter, signal spawns, labels, synthetic
    /// articles). Unset means entropy.
    pub seed: Option<u64>,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        Ok(config)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.stream.reconnect_base_ms),
            Duration::from_millis(self.stream.reconnect_max_ms),
        )
    }

    pub fn synthetic_timing(&self) -> SyntheticTiming {
        SyntheticTiming {
            first_delay: Duration::from_millis(self.synthetic.first_delay_ms),
            min_interval: Duration::from_millis(self.synthetic.min_interval_ms),
            max_interval: Duration::from_millis(self.synthetic.max_interval_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.metrics.poll_interval_secs.max(1))
    }
}
