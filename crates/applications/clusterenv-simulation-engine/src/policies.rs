//! Baseline controllers
//!
//! Heuristics that drive the simulator through the same action interface a
//! learned policy would use:
//! - FirstFit: first queued job on the first node that can take it
//! - BestFit: the feasible placement that leaves the least free capacity
//! - Random: uniform over currently valid actions
//! - AdvanceOnly: never places anything (lower bound)

use clusterenv_core::{Action, ClusterState, check_placement};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{EngineError, Result};

/// Chooses the next action from a read-only view of the state
pub trait Controller {
    fn select_action(&mut self, state: &ClusterState) -> Action;

    fn name(&self) -> &str;
}

fn feasible(state: &ClusterState, node: usize, job: usize) -> bool {
    matches!(check_placement(state, node, job), Ok(admission) if admission.is_placed())
}

/// Place the first queued job on the first node with room; otherwise advance
pub struct FirstFitController;

impl Controller for FirstFitController {
    fn select_action(&mut self, state: &ClusterState) -> Action {
        for job in state.queued_jobs() {
            if let Some(node) = (0..state.n_nodes()).find(|&node| feasible(state, node, job)) {
                return Action::Place { node, job };
            }
        }
        Action::Advance
    }

    fn name(&self) -> &str {
        "FirstFit"
    }
}

/// Pick the feasible placement whose node has the least free capacity left
/// over the job's duration afterwards
pub struct BestFitController;

impl BestFitController {
    fn slack(state: &ClusterState, node: usize, job: usize) -> f64 {
        let capacity = state.nodes()[node].capacity();
        let job = &state.jobs()[job];
        let mut slack = 0.0;
        for r in 0..state.resource_dims() {
            for t in 0..job.duration() {
                slack += capacity.get(r, t) - job.demand().get(r, t);
            }
        }
        slack
    }
}

impl Controller for BestFitController {
    fn select_action(&mut self, state: &ClusterState) -> Action {
        let mut best: Option<(f64, Action)> = None;
        for job in state.queued_jobs() {
            for node in 0..state.n_nodes() {
                if !feasible(state, node, job) {
                    continue;
                }
                let slack = Self::slack(state, node, job);
                if best.is_none_or(|(lowest, _)| slack < lowest) {
                    best = Some((slack, Action::Place { node, job }));
                }
            }
        }
        best.map_or(Action::Advance, |(_, action)| action)
    }

    fn name(&self) -> &str {
        "BestFit"
    }
}

/// Uniformly random over the valid action mask
pub struct RandomController {
    rng: StdRng,
}

impl RandomController {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        RandomController { rng }
    }
}

impl Controller for RandomController {
    fn select_action(&mut self, state: &ClusterState) -> Action {
        let valid: Vec<usize> = state
            .valid_actions()
            .iter()
            .enumerate()
            .filter(|(_, ok)| **ok)
            .map(|(raw, _)| raw)
            .collect();
        let raw = valid.choose(&mut self.rng).copied().unwrap_or(0);
        Action::decode(raw, state.n_nodes(), state.n_jobs()).unwrap_or(Action::Advance)
    }

    fn name(&self) -> &str {
        "Random"
    }
}

/// Only ever advances time
pub struct AdvanceOnlyController;

impl Controller for AdvanceOnlyController {
    fn select_action(&mut self, _state: &ClusterState) -> Action {
        Action::Advance
    }

    fn name(&self) -> &str {
        "AdvanceOnly"
    }
}

/// Build a controller from its CLI name
pub fn controller_from_name(name: &str, seed: Option<u64>) -> Result<Box<dyn Controller>> {
    match name {
        "first-fit" => Ok(Box::new(FirstFitController)),
        "best-fit" => Ok(Box::new(BestFitController)),
        "random" => Ok(Box::new(RandomController::new(seed))),
        "advance" => Ok(Box::new(AdvanceOnlyController)),
        other => Err(EngineError::UnknownPolicy(other.to_string())),
    }
}
