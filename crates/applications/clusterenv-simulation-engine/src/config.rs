//! Scenario configuration
//!
//! Loaded from JSON, with every field defaulted, then overridden by CLI flags.

use std::path::Path;

use clusterenv_core::RewardConfig;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Shape and distributions of a synthetic scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub n_nodes: usize,
    pub n_jobs: usize,
    pub resource_dims: usize,
    /// Forecast window length (T)
    pub horizon: usize,
    /// Nominal capacity of every node in every resource dimension
    pub max_node_capacity: f64,
    /// Mean job arrivals per tick
    pub arrival_rate: f64,
    pub min_duration: usize,
    pub max_duration: usize,
    /// Mean demand as a fraction of node capacity
    pub demand_mean_fraction: f64,
    /// Demand standard deviation as a fraction of node capacity
    pub demand_std_fraction: f64,
    /// Seed for reproducible scenarios; random when unset
    pub seed: Option<u64>,
    pub reward: RewardConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            n_nodes: 3,
            n_jobs: 10,
            resource_dims: 2,
            horizon: 10,
            max_node_capacity: 10.0,
            arrival_rate: 1.0,
            min_duration: 1,
            max_duration: 5,
            demand_mean_fraction: 0.3,
            demand_std_fraction: 0.15,
            seed: None,
            reward: RewardConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Read a JSON config file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ScenarioConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_nodes == 0 {
            return Err(EngineError::config("n_nodes must be at least 1"));
        }
        if self.resource_dims == 0 {
            return Err(EngineError::config("resource_dims must be at least 1"));
        }
        if self.horizon == 0 {
            return Err(EngineError::config("horizon must be at least 1"));
        }
        if !(self.max_node_capacity.is_finite() && self.max_node_capacity > 0.0) {
            return Err(EngineError::config(format!(
                "max_node_capacity must be positive, got {}",
                self.max_node_capacity
            )));
        }
        if !(self.arrival_rate.is_finite() && self.arrival_rate > 0.0) {
            return Err(EngineError::config(format!(
                "arrival_rate must be positive, got {}",
                self.arrival_rate
            )));
        }
        if self.min_duration == 0 || self.min_duration > self.max_duration {
            return Err(EngineError::config(format!(
                "duration range [{}, {}] is empty or starts at zero",
                self.min_duration, self.max_duration
            )));
        }
        if self.max_duration > self.horizon {
            return Err(EngineError::config(format!(
                "max_duration {} exceeds horizon {}",
                self.max_duration, self.horizon
            )));
        }
        if !(self.demand_mean_fraction.is_finite() && self.demand_mean_fraction >= 0.0) {
            return Err(EngineError::config("demand_mean_fraction must be non-negative"));
        }
        if !(self.demand_std_fraction.is_finite() && self.demand_std_fraction >= 0.0) {
            return Err(EngineError::config("demand_std_fraction must be non-negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ScenarioConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScenarioConfig =
            serde_json::from_str(r#"{"n_nodes": 5, "seed": 7, "reward": {"queue_weight": 1.0}}"#)
                .unwrap();

        assert_eq!(config.n_nodes, 5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.horizon, 10);
        assert_eq!(config.reward.queue_weight, 1.0);
        assert_eq!(config.reward.invalid_placement_penalty, -100.0);
    }

    #[test]
    fn test_rejects_duration_beyond_horizon() {
        let config = ScenarioConfig {
            horizon: 4,
            max_duration: 6,
            ..ScenarioConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_nodes() {
        let config = ScenarioConfig {
            n_nodes: 0,
            ..ScenarioConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
