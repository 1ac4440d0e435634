//! Clusterenv Simulation Engine
//!
//! Synthetic scenarios, baseline controllers and episode metrics for the
//! clusterenv scheduling simulator.

pub mod config;
pub mod error;
pub mod generator;
pub mod policies;
pub mod render;
pub mod runner;

pub use config::ScenarioConfig;
pub use error::{EngineError, Result};
pub use generator::RandomScenarioGenerator;
pub use policies::{Controller, controller_from_name};
pub use render::TextRenderer;
pub use runner::{EpisodeResult, EpisodeRunner, PolicySummary};
