//! Synthetic scenario generation
//!
//! Models a scenario as:
//! - Poisson job arrivals (exponential inter-arrival gaps), clamped to the horizon
//! - Uniform job durations in `[min_duration, max_duration]`
//! - Normally distributed per-resource demand, constant over the job's duration
//!
//! All nodes start at `max_node_capacity` in every dimension.

use clusterenv_core::{ClusterError, ClusterState, Job, Node, ScenarioGenerator};
use rand::SeedableRng;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp, Normal};
use tracing::debug;

use crate::config::ScenarioConfig;
use crate::error::Result;

/// Random scenario generator driven by a [`ScenarioConfig`]
pub struct RandomScenarioGenerator {
    config: ScenarioConfig,
    rng: StdRng,
}

impl RandomScenarioGenerator {
    /// Create a generator, seeded from the config when a seed is set
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(RandomScenarioGenerator { config, rng })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Arrival ticks for `n_jobs`, non-decreasing, within `[0, horizon]`
    fn sample_arrivals(&mut self) -> clusterenv_core::Result<Vec<u64>> {
        let gaps = Exp::new(self.config.arrival_rate)
            .map_err(|e| ClusterError::generator(format!("arrival distribution: {e}")))?;
        let horizon = self.config.horizon as f64;

        let mut clock = 0.0_f64;
        let mut arrivals = Vec::with_capacity(self.config.n_jobs);
        for _ in 0..self.config.n_jobs {
            arrivals.push(clock.floor().min(horizon) as u64);
            clock += gaps.sample(&mut self.rng);
        }
        Ok(arrivals)
    }

    /// Demand rows for one job: one constant row per resource dimension
    fn sample_demand(&mut self, duration: usize, magnitude: &Normal<f64>) -> Vec<Vec<f64>> {
        let cap = self.config.max_node_capacity;
        let floor = cap.min(1.0);
        (0..self.config.resource_dims)
            .map(|_| {
                let level = magnitude.sample(&mut self.rng).round().clamp(floor, cap);
                vec![level; duration]
            })
            .collect()
    }
}

impl ScenarioGenerator for RandomScenarioGenerator {
    fn generate(&mut self) -> clusterenv_core::Result<ClusterState> {
        let cfg = self.config.clone();

        let nodes = (0..cfg.n_nodes)
            .map(|id| Node::uniform(id, cfg.resource_dims, cfg.max_node_capacity, cfg.horizon))
            .collect::<clusterenv_core::Result<Vec<_>>>()?;

        let arrivals = self.sample_arrivals()?;
        let durations = Uniform::new_inclusive(cfg.min_duration, cfg.max_duration);
        let magnitude = Normal::new(
            cfg.demand_mean_fraction * cfg.max_node_capacity,
            cfg.demand_std_fraction * cfg.max_node_capacity,
        )
        .map_err(|e| ClusterError::generator(format!("demand distribution: {e}")))?;

        let mut jobs = Vec::with_capacity(cfg.n_jobs);
        for (id, arrival_tick) in arrivals.into_iter().enumerate() {
            let duration = durations.sample(&mut self.rng);
            let rows = self.sample_demand(duration, &magnitude);
            jobs.push(Job::from_rows(id, arrival_tick, &rows, cfg.horizon)?);
        }

        debug!(
            nodes = nodes.len(),
            jobs = jobs.len(),
            last_arrival = ?jobs.last().map(|j| j.arrival_tick),
            "generated scenario"
        );

        ClusterState::new(nodes, jobs, cfg.resource_dims, cfg.horizon)
    }
}
