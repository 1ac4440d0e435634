//! Clusterenv Simulation Engine CLI
//!
//! Runs baseline controllers against synthetic cluster scheduling scenarios
//! and compares their episode metrics.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clusterenv_core::{ClusterEnv, Renderer};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clusterenv_simulation_engine::{
    EpisodeResult, EpisodeRunner, PolicySummary, RandomScenarioGenerator, ScenarioConfig,
    TextRenderer, controller_from_name,
};

#[derive(Parser, Debug)]
#[command(name = "clusterenv-sim")]
#[command(about = "Simulate cluster job scheduling with baseline controllers", long_about = None)]
struct Args {
    /// Scenario config file (JSON); flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of nodes
    #[arg(long)]
    nodes: Option<usize>,

    /// Number of jobs
    #[arg(long)]
    jobs: Option<usize>,

    /// Number of resource dimensions
    #[arg(long)]
    resources: Option<usize>,

    /// Forecast window length in ticks
    #[arg(long)]
    horizon: Option<usize>,

    /// Nominal node capacity per resource dimension
    #[arg(long)]
    capacity: Option<f64>,

    /// Seed for scenario generation and the random controller
    #[arg(long)]
    seed: Option<u64>,

    /// Policies to compare (comma-separated: first-fit,best-fit,random,advance)
    #[arg(short, long, default_value = "first-fit,best-fit,random")]
    policies: String,

    /// Episodes per policy
    #[arg(short, long, default_value_t = 5)]
    episodes: usize,

    /// Step cap per episode
    #[arg(long, default_value_t = 10_000)]
    max_steps: u64,

    /// Draw every tick to stdout
    #[arg(long)]
    render: bool,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report {
    config: ScenarioConfig,
    summaries: Vec<PolicySummary>,
    episodes: Vec<EpisodeResult>,
}

fn load_config(args: &Args) -> anyhow::Result<ScenarioConfig> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ScenarioConfig::default(),
    };

    if let Some(nodes) = args.nodes {
        config.n_nodes = nodes;
    }
    if let Some(jobs) = args.jobs {
        config.n_jobs = jobs;
    }
    if let Some(resources) = args.resources {
        config.resource_dims = resources;
    }
    if let Some(horizon) = args.horizon {
        config.horizon = horizon;
        config.max_duration = config.max_duration.min(horizon);
        config.min_duration = config.min_duration.min(config.max_duration);
    }
    if let Some(capacity) = args.capacity {
        config.max_node_capacity = capacity;
    }
    // Every policy sees the same scenarios
    config.seed = Some(args.seed.or(config.seed).unwrap_or_else(rand::random));

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "clusterenv=debug,info"
    } else {
        "clusterenv=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = load_config(&args)?;
    info!(
        nodes = config.n_nodes,
        jobs = config.n_jobs,
        resources = config.resource_dims,
        horizon = config.horizon,
        seed = ?config.seed,
        "starting simulation"
    );

    let policy_names: Vec<&str> = args
        .policies
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let runner = EpisodeRunner::new(args.max_steps);
    let mut summaries = Vec::new();
    let mut episodes = Vec::new();

    for policy_name in &policy_names {
        let mut controller = controller_from_name(policy_name, config.seed)?;
        let generator = RandomScenarioGenerator::new(config.clone())?;
        let mut env = ClusterEnv::new(generator, config.reward)?;
        let mut renderer = args
            .render
            .then(|| TextRenderer::new(io::stdout(), config.max_node_capacity));

        let mut results = Vec::with_capacity(args.episodes);
        for episode in 0..args.episodes {
            let renderer = renderer.as_mut().map(|r| r as &mut dyn Renderer);
            // The env already holds its first scenario from construction
            let result = if episode == 0 {
                runner.play(&mut env, controller.as_mut(), renderer)?
            } else {
                runner.run(&mut env, controller.as_mut(), renderer)?
            };
            debug!(?result, "episode result");
            results.push(result);
        }

        summaries.push(PolicySummary::from_results(controller.name(), &results));
        episodes.extend(results);
    }

    println!(
        "{:<14} {:>9} {:>12} {:>10} {:>12} {:>10} {:>10}",
        "Policy", "Episodes", "Mean reward", "Mean ticks", "Completion", "Slowdown", "Truncated"
    );
    println!("{}", "-".repeat(84));
    for summary in &summaries {
        println!(
            "{:<14} {:>9} {:>12.2} {:>10.1} {:>11.1}% {:>10.2} {:>10}",
            summary.policy_name,
            summary.episodes,
            summary.mean_reward,
            summary.mean_ticks,
            summary.completion_rate * 100.0,
            summary.mean_slowdown,
            summary.truncated_episodes,
        );
    }

    if let Some(output_path) = &args.output {
        let report = Report {
            config,
            summaries,
            episodes,
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(output_path, json)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        info!(path = %output_path.display(), "results saved");
    }

    Ok(())
}
