//! Control loop: step/reset protocol for an external controller
//!
//! One action in, one [`StepResult`] out. The environment owns its
//! [`ClusterState`] exclusively; run independent episodes on independent
//! environments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::Action;
use crate::error::Result;
use crate::observation::{Frame, Observation};
use crate::scheduler::{self, Admission};
use crate::state::{ClusterState, TickReport};

/// Produces initial cluster states for new episodes
pub trait ScenarioGenerator {
    /// Build a fresh, valid initial state
    fn generate(&mut self) -> Result<ClusterState>;
}

/// Draws frames. Output is never read back by the simulator.
pub trait Renderer {
    fn render(&mut self, frame: &Frame);
}

/// Replays the same prebuilt state on every reset
#[derive(Debug, Clone)]
pub struct FixedScenario {
    initial: ClusterState,
}

impl FixedScenario {
    pub fn new(initial: ClusterState) -> Self {
        FixedScenario { initial }
    }
}

impl ScenarioGenerator for FixedScenario {
    fn generate(&mut self) -> Result<ClusterState> {
        Ok(self.initial.clone())
    }
}

/// Reward shaping parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Penalty per queued job per step
    pub queue_weight: f64,
    /// Added when a placement is rejected
    pub invalid_placement_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            queue_weight: 0.5,
            invalid_placement_penalty: -100.0,
        }
    }
}

impl RewardConfig {
    /// Reward for a step that leaves `queue_length` jobs queued
    pub fn reward(&self, queue_length: usize, rejected: bool) -> f64 {
        let base = -self.queue_weight * queue_length as f64;
        if rejected {
            base + self.invalid_placement_penalty
        } else {
            base
        }
    }
}

/// What an action did to the state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The environment was reset
    Reset,
    /// The clock advanced
    Advanced(TickReport),
    /// A placement was attempted; see [`Admission::is_placed`]
    Placement {
        node: usize,
        job: usize,
        admission: Admission,
    },
}

impl StepOutcome {
    pub fn is_rejected_placement(&self) -> bool {
        matches!(self, StepOutcome::Placement { admission, .. } if !admission.is_placed())
    }
}

/// Everything returned to the controller after one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    /// Every job has completed
    pub terminated: bool,
    /// Always false; step caps belong to the caller
    pub truncated: bool,
    /// Always empty; kept for generic control-loop callers
    pub info: BTreeMap<String, serde_json::Value>,
    pub outcome: StepOutcome,
}

/// A cluster scheduling episode driven one action at a time
pub struct ClusterEnv<G: ScenarioGenerator> {
    generator: G,
    state: ClusterState,
    reward: RewardConfig,
    last_invalid_action: Option<Action>,
    episode: u64,
}

impl<G: ScenarioGenerator> ClusterEnv<G> {
    /// Create an environment and generate its first episode
    pub fn new(mut generator: G, reward: RewardConfig) -> Result<Self> {
        let state = generator.generate()?;
        Ok(ClusterEnv {
            generator,
            state,
            reward,
            last_invalid_action: None,
            episode: 0,
        })
    }

    pub fn state(&self) -> &ClusterState {
        &self.state
    }

    pub fn reward_config(&self) -> &RewardConfig {
        &self.reward
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn action_space_size(&self) -> usize {
        Action::space_size(self.state.n_nodes(), self.state.n_jobs())
    }

    pub fn observe(&self) -> Observation {
        self.state.observe()
    }

    pub fn frame(&self) -> Frame {
        Frame {
            observation: self.state.observe(),
            last_invalid_action: self.last_invalid_action,
        }
    }

    pub fn render(&self, renderer: &mut impl Renderer) {
        renderer.render(&self.frame());
    }

    /// Discard the current state and start a new episode
    pub fn reset(&mut self) -> Result<StepResult> {
        self.state = self.generator.generate()?;
        self.last_invalid_action = None;
        self.episode += 1;
        info!(
            episode = self.episode,
            nodes = self.state.n_nodes(),
            jobs = self.state.n_jobs(),
            "episode reset"
        );
        Ok(StepResult {
            observation: self.state.observe(),
            reward: 0.0,
            terminated: self.state.all_jobs_complete(),
            truncated: false,
            info: BTreeMap::new(),
            outcome: StepOutcome::Reset,
        })
    }

    /// Decode a flat action integer and apply it
    pub fn step(&mut self, raw_action: usize) -> Result<StepResult> {
        let action = Action::decode(raw_action, self.state.n_nodes(), self.state.n_jobs())?;
        self.step_action(action)
    }

    /// Apply one action
    pub fn step_action(&mut self, action: Action) -> Result<StepResult> {
        let outcome = match action {
            Action::Advance => StepOutcome::Advanced(self.state.tick()),
            Action::Place { node, job } => {
                let admission = scheduler::place(&mut self.state, node, job)?;
                StepOutcome::Placement {
                    node,
                    job,
                    admission,
                }
            }
        };

        let rejected = outcome.is_rejected_placement();
        self.last_invalid_action = rejected.then_some(action);

        let reward = self.reward.reward(self.state.queue_length(), rejected);
        let terminated = self.state.all_jobs_complete();
        debug!(
            ?action,
            reward,
            terminated,
            tick = self.state.current_time(),
            "step"
        );

        Ok(StepResult {
            observation: self.state.observe(),
            reward,
            terminated,
            truncated: false,
            info: BTreeMap::new(),
            outcome,
        })
    }
}
