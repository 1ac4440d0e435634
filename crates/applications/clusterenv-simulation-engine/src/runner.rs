//! Episode runner
//!
//! Drives a [`ClusterEnv`] with a [`Controller`] until every job completes
//! or a step cap is reached, and collects per-episode metrics.

use clusterenv_core::{ClusterEnv, Renderer, ScenarioGenerator, StepOutcome};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::policies::Controller;

/// Result of one episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub policy_name: String,
    pub episode: u64,
    pub steps: u64,
    pub ticks: u64,
    pub total_reward: f64,
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub rejected_placements: usize,
    /// Stopped by the step cap rather than by completing every job
    pub truncated: bool,
    pub average_queueing_delay: f64,
    pub p99_queueing_delay: f64,
    /// Mean of (completion - arrival) / duration over completed jobs
    pub average_slowdown: f64,
}

/// Aggregate over several episodes of one policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySummary {
    pub policy_name: String,
    pub episodes: usize,
    pub mean_reward: f64,
    pub mean_ticks: f64,
    pub completion_rate: f64,
    pub mean_slowdown: f64,
    pub truncated_episodes: usize,
}

impl PolicySummary {
    pub fn from_results(policy_name: &str, results: &[EpisodeResult]) -> Self {
        let n = results.len().max(1) as f64;
        let total_jobs: usize = results.iter().map(|r| r.total_jobs).sum();
        let completed: usize = results.iter().map(|r| r.completed_jobs).sum();
        PolicySummary {
            policy_name: policy_name.to_string(),
            episodes: results.len(),
            mean_reward: results.iter().map(|r| r.total_reward).sum::<f64>() / n,
            mean_ticks: results.iter().map(|r| r.ticks as f64).sum::<f64>() / n,
            completion_rate: if total_jobs == 0 {
                1.0
            } else {
                completed as f64 / total_jobs as f64
            },
            mean_slowdown: results.iter().map(|r| r.average_slowdown).sum::<f64>() / n,
            truncated_episodes: results.iter().filter(|r| r.truncated).count(),
        }
    }
}

/// Runs episodes with a step cap
pub struct EpisodeRunner {
    max_steps: u64,
}

impl EpisodeRunner {
    pub fn new(max_steps: u64) -> Self {
        EpisodeRunner { max_steps }
    }

    /// Reset the environment and play one episode
    pub fn run<G: ScenarioGenerator>(
        &self,
        env: &mut ClusterEnv<G>,
        controller: &mut dyn Controller,
        renderer: Option<&mut dyn Renderer>,
    ) -> Result<EpisodeResult> {
        let start = env.reset()?;
        self.play_from(env, controller, renderer, start.terminated)
    }

    /// Play one episode from the environment's current state without
    /// resetting. A freshly built [`ClusterEnv`] already holds a generated
    /// scenario, so its first episode can start here.
    pub fn play<G: ScenarioGenerator>(
        &self,
        env: &mut ClusterEnv<G>,
        controller: &mut dyn Controller,
        renderer: Option<&mut dyn Renderer>,
    ) -> Result<EpisodeResult> {
        let terminated = env.state().all_jobs_complete();
        self.play_from(env, controller, renderer, terminated)
    }

    fn play_from<G: ScenarioGenerator>(
        &self,
        env: &mut ClusterEnv<G>,
        controller: &mut dyn Controller,
        mut renderer: Option<&mut dyn Renderer>,
        mut terminated: bool,
    ) -> Result<EpisodeResult> {
        let mut steps = 0u64;
        let mut total_reward = 0.0;
        let mut rejected_placements = 0usize;

        if let Some(r) = renderer.as_deref_mut() {
            r.render(&env.frame());
        }

        while !terminated && steps < self.max_steps {
            let action = controller.select_action(env.state());
            let step = env.step_action(action)?;
            terminated = step.terminated;
            steps += 1;
            total_reward += step.reward;
            if step.outcome.is_rejected_placement() {
                rejected_placements += 1;
            }
            if let Some(r) = renderer.as_deref_mut() {
                if matches!(step.outcome, StepOutcome::Advanced(_)) || step.terminated {
                    r.render(&env.frame());
                }
            }
        }

        let truncated = !terminated;
        if truncated {
            warn!(
                policy = controller.name(),
                steps,
                "episode truncated before all jobs completed"
            );
        }

        let result = Self::collect_results(
            env,
            controller.name(),
            steps,
            total_reward,
            rejected_placements,
            truncated,
        );
        info!(
            policy = %result.policy_name,
            episode = result.episode,
            ticks = result.ticks,
            reward = result.total_reward,
            completed = result.completed_jobs,
            "episode finished"
        );
        Ok(result)
    }

    fn collect_results<G: ScenarioGenerator>(
        env: &ClusterEnv<G>,
        policy_name: &str,
        steps: u64,
        total_reward: f64,
        rejected_placements: usize,
        truncated: bool,
    ) -> EpisodeResult {
        let state = env.state();

        let mut delays: Vec<f64> = state
            .jobs()
            .iter()
            .filter_map(|job| job.queueing_delay())
            .map(|d| d as f64)
            .collect();
        delays.sort_by(|a, b| a.total_cmp(b));

        let average_queueing_delay = if !delays.is_empty() {
            delays.iter().sum::<f64>() / delays.len() as f64
        } else {
            0.0
        };

        let p99_queueing_delay = if !delays.is_empty() {
            let idx = ((delays.len() as f64 * 0.99) as usize).min(delays.len() - 1);
            delays[idx]
        } else {
            0.0
        };

        let slowdowns: Vec<f64> = state
            .jobs()
            .iter()
            .filter_map(|job| {
                let end = job.completed_at()?;
                let duration = job.duration().max(1) as f64;
                Some(end.saturating_sub(job.arrival_tick) as f64 / duration)
            })
            .collect();
        let average_slowdown = if !slowdowns.is_empty() {
            slowdowns.iter().sum::<f64>() / slowdowns.len() as f64
        } else {
            0.0
        };

        EpisodeResult {
            policy_name: policy_name.to_string(),
            episode: env.episode(),
            steps,
            ticks: state.current_time(),
            total_reward,
            total_jobs: state.n_jobs(),
            completed_jobs: slowdowns.len(),
            rejected_placements,
            truncated,
            average_queueing_delay,
            p99_queueing_delay,
            average_slowdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::generator::RandomScenarioGenerator;
    use crate::policies::{AdvanceOnlyController, FirstFitController};
    use clusterenv_core::{ClusterState, FixedScenario, Job, Node, RewardConfig};

    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingScenario {
        inner: FixedScenario,
        generated: Rc<Cell<usize>>,
    }

    impl ScenarioGenerator for CountingScenario {
        fn generate(&mut self) -> clusterenv_core::Result<ClusterState> {
            self.generated.set(self.generated.get() + 1);
            self.inner.generate()
        }
    }

    fn single_job_env() -> ClusterEnv<FixedScenario> {
        let nodes = vec![Node::uniform(0, 1, 10.0, 3).unwrap()];
        let jobs = vec![Job::from_rows(0, 0, &[vec![4.0, 4.0, 4.0]], 3).unwrap()];
        let state = ClusterState::new(nodes, jobs, 1, 3).unwrap();
        ClusterEnv::new(FixedScenario::new(state), RewardConfig::default()).unwrap()
    }

    #[test]
    fn test_first_fit_completes_single_job() {
        let mut env = single_job_env();
        let result = EpisodeRunner::new(100)
            .run(&mut env, &mut FirstFitController, None)
            .unwrap();

        assert!(!result.truncated);
        assert_eq!(result.steps, 4);
        assert_eq!(result.ticks, 3);
        assert_eq!(result.completed_jobs, 1);
        assert_eq!(result.rejected_placements, 0);
        assert_eq!(result.total_reward, 0.0);
        assert_eq!(result.average_queueing_delay, 0.0);
        assert_eq!(result.average_slowdown, 1.0);
    }

    #[test]
    fn test_advance_only_is_truncated() {
        let mut env = single_job_env();
        let result = EpisodeRunner::new(5)
            .run(&mut env, &mut AdvanceOnlyController, None)
            .unwrap();

        assert!(result.truncated);
        assert_eq!(result.steps, 5);
        assert_eq!(result.completed_jobs, 0);
        assert_eq!(result.total_reward, -2.5);
    }

    #[test]
    fn test_first_fit_finishes_generated_scenario() {
        let generator = RandomScenarioGenerator::new(ScenarioConfig {
            seed: Some(11),
            ..ScenarioConfig::default()
        })
        .unwrap();
        let mut env = ClusterEnv::new(generator, RewardConfig::default()).unwrap();

        let result = EpisodeRunner::new(10_000)
            .run(&mut env, &mut FirstFitController, None)
            .unwrap();
        assert!(!result.truncated);
        assert_eq!(result.completed_jobs, result.total_jobs);
        assert!(result.total_reward <= 0.0);
    }

    #[test]
    fn test_summary() {
        let mut env = single_job_env();
        let runner = EpisodeRunner::new(100);
        let results = vec![
            runner.run(&mut env, &mut FirstFitController, None).unwrap(),
            runner.run(&mut env, &mut FirstFitController, None).unwrap(),
        ];
        let summary = PolicySummary::from_results("FirstFit", &results);

        assert_eq!(summary.episodes, 2);
        assert_eq!(summary.completion_rate, 1.0);
        assert_eq!(summary.mean_ticks, 3.0);
        assert_eq!(summary.truncated_episodes, 0);
    }

    #[test]
    fn test_play_uses_scenario_built_by_new() {
        let generated = Rc::new(Cell::new(0));
        let scenario = CountingScenario {
            inner: FixedScenario::new(single_job_env().state().clone()),
            generated: Rc::clone(&generated),
        };
        let mut env = ClusterEnv::new(scenario, RewardConfig::default()).unwrap();
        let runner = EpisodeRunner::new(100);

        let first = runner.play(&mut env, &mut FirstFitController, None).unwrap();
        assert_eq!(first.episode, 0);
        assert_eq!(first.completed_jobs, 1);
        assert_eq!(generated.get(), 1);

        let second = runner.run(&mut env, &mut FirstFitController, None).unwrap();
        assert_eq!(second.episode, 1);
        assert_eq!(second.steps, first.steps);
        assert_eq!(generated.get(), 2);
    }
}
