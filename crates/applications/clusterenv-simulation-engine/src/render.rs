//! Plain-text rendering of simulator frames

use std::io::Write;

use clusterenv_core::{Frame, JobStatus, Renderer};
use tracing::warn;

/// Writes an ASCII view of each frame: per-node free capacity per
/// resource dimension across the forecast window, then the queue.
pub struct TextRenderer<W: Write> {
    out: W,
    /// Nominal capacity used to scale the bars
    scale: f64,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, scale: f64) -> Self {
        TextRenderer { out, scale }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn cell(&self, free: f64) -> char {
        let used = if self.scale > 0.0 {
            1.0 - (free / self.scale).clamp(0.0, 1.0)
        } else {
            0.0
        };
        match used {
            u if u <= 0.0 => '.',
            u if u < 0.34 => '-',
            u if u < 0.67 => '=',
            u if u < 1.0 => '#',
            _ => '@',
        }
    }

    fn write_frame(&mut self, frame: &Frame) -> std::io::Result<()> {
        let obs = &frame.observation;
        let (n_nodes, dims, horizon) = obs.usage.dim();

        writeln!(self.out, "t={}", obs.current_time)?;
        for n in 0..n_nodes {
            for r in 0..dims {
                let row: String = (0..horizon).map(|t| self.cell(obs.usage[[n, r, t]])).collect();
                writeln!(self.out, "  node {n} r{r} |{row}|")?;
            }
        }

        let queued: Vec<String> = obs
            .queued
            .iter()
            .enumerate()
            .filter(|(_, queued)| **queued)
            .map(|(j, _)| j.to_string())
            .collect();
        let running = obs.jobs_status.iter().filter(|s| **s == JobStatus::Running).count();
        let completed = obs.jobs_status.iter().filter(|s| **s == JobStatus::Completed).count();
        writeln!(
            self.out,
            "  queue [{}] running {} completed {}/{}",
            queued.join(" "),
            running,
            completed,
            obs.jobs_status.len()
        )?;

        if let Some(action) = frame.last_invalid_action {
            writeln!(self.out, "  rejected {action:?}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, frame: &Frame) {
        if let Err(e) = self.write_frame(frame) {
            warn!("failed to render frame: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterenv_core::{Action, ClusterEnv, ClusterState, FixedScenario, Job, Node, RewardConfig};

    fn env() -> ClusterEnv<FixedScenario> {
        let nodes = vec![Node::uniform(0, 1, 10.0, 4).unwrap()];
        let jobs = vec![
            Job::from_rows(0, 0, &[vec![5.0, 5.0]], 4).unwrap(),
            Job::from_rows(1, 0, &[vec![20.0]], 4).unwrap(),
        ];
        let state = ClusterState::new(nodes, jobs, 1, 4).unwrap();
        ClusterEnv::new(FixedScenario::new(state), RewardConfig::default()).unwrap()
    }

    fn rendered(env: &ClusterEnv<FixedScenario>) -> String {
        let mut renderer = TextRenderer::new(Vec::new(), 10.0);
        env.render(&mut renderer);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_render_initial_frame() {
        let text = rendered(&env());
        assert!(text.starts_with("t=0"));
        assert!(text.contains("node 0 r0 |....|"));
        assert!(text.contains("queue [0 1] running 0 completed 0/2"));
        assert!(!text.contains("rejected"));
    }

    #[test]
    fn test_render_shows_usage_and_rejection() {
        let mut env = env();
        env.step_action(Action::Place { node: 0, job: 0 }).unwrap();
        env.step_action(Action::Place { node: 0, job: 1 }).unwrap();

        let text = rendered(&env);
        assert!(text.contains("node 0 r0 |==..|"));
        assert!(text.contains("queue [1] running 1 completed 0/2"));
        assert!(text.contains("rejected Place { node: 0, job: 1 }"));
    }

    #[test]
    fn test_render_lists_zero_demand_job() {
        let nodes = vec![Node::uniform(0, 1, 10.0, 2).unwrap()];
        let jobs = vec![Job::from_rows(0, 0, &[vec![]], 2).unwrap()];
        let state = ClusterState::new(nodes, jobs, 1, 2).unwrap();
        let env = ClusterEnv::new(FixedScenario::new(state), RewardConfig::default()).unwrap();

        let text = rendered(&env);
        assert!(text.contains("queue [0] running 0 completed 0/1"));
    }
}
