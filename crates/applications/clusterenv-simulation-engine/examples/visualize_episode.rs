//! Visualize node utilization over one FirstFit episode
//!
//! Generates an interactive HTML chart with one line per node showing the
//! fraction of capacity in use at offset 0, plus the queue length.
//!
//! Usage:
//!   cargo run --example visualize_episode
//!   Open visualizations/episode.html in browser

use clusterenv_core::{ClusterEnv, Frame, Renderer};
use clusterenv_simulation_engine::{
    EpisodeRunner, RandomScenarioGenerator, ScenarioConfig, policies::FirstFitController,
};
use plotly::{
    Plot, Scatter,
    common::{Line, Mode},
    layout::{Axis, Layout},
};

/// Records per-tick utilization instead of drawing immediately
struct UtilizationRecorder {
    capacity: f64,
    times: Vec<f64>,
    per_node: Vec<Vec<f64>>,
    queue: Vec<f64>,
}

impl Renderer for UtilizationRecorder {
    fn render(&mut self, frame: &Frame) {
        let obs = &frame.observation;
        let (n_nodes, dims, _) = obs.usage.dim();
        if self.per_node.is_empty() {
            self.per_node = vec![Vec::new(); n_nodes];
        }

        self.times.push(obs.current_time as f64);
        for n in 0..n_nodes {
            let free: f64 = (0..dims).map(|r| obs.usage[[n, r, 0]]).sum();
            self.per_node[n].push(1.0 - free / (self.capacity * dims as f64));
        }
        let queued = obs.queued.iter().filter(|queued| **queued).count();
        self.queue.push(queued as f64);
    }
}

fn main() {
    println!("Generating episode utilization visualization...");

    let config = ScenarioConfig {
        n_nodes: 3,
        n_jobs: 40,
        horizon: 20,
        max_duration: 10,
        seed: Some(2024),
        ..ScenarioConfig::default()
    };
    let capacity = config.max_node_capacity;
    let generator = RandomScenarioGenerator::new(config.clone()).expect("valid config");
    let mut env = ClusterEnv::new(generator, config.reward).expect("valid scenario");

    let mut recorder = UtilizationRecorder {
        capacity,
        times: Vec::new(),
        per_node: Vec::new(),
        queue: Vec::new(),
    };
    let result = EpisodeRunner::new(10_000)
        .play(&mut env, &mut FirstFitController, Some(&mut recorder))
        .expect("episode runs");

    println!("   Episode finished in {} ticks", result.ticks);

    let mut plot = Plot::new();
    for (n, series) in recorder.per_node.iter().enumerate() {
        plot.add_trace(
            Scatter::new(recorder.times.clone(), series.clone())
                .name(format!("Node {n} utilization"))
                .mode(Mode::Lines)
                .line(Line::new().width(2.0)),
        );
    }
    plot.add_trace(
        Scatter::new(recorder.times.clone(), recorder.queue.clone())
            .name("Queue length")
            .mode(Mode::Lines)
            .y_axis("y2"),
    );

    let layout = Layout::new()
        .title("Cluster utilization (FirstFit)")
        .x_axis(Axis::new().title("Tick"))
        .y_axis(Axis::new().title("Utilization").range(vec![0.0, 1.0]))
        .y_axis2(
            Axis::new()
                .title("Queued jobs")
                .overlaying("y")
                .side(plotly::common::AxisSide::Right),
        );
    plot.set_layout(layout);

    let output_path = "visualizations/episode.html";
    std::fs::create_dir_all("visualizations").expect("create output dir");
    plot.write_html(output_path);

    println!("Visualization saved to {}", output_path);
}
