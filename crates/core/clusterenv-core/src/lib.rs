//! Clusterenv Core
//!
//! Discrete-time cluster scheduling simulator. A fixed set of nodes each
//! carries a forward-looking capacity window; jobs arrive over time with a
//! per-resource demand profile. A controller repeatedly either advances the
//! clock or asks to place a queued job on a node, and receives an
//! observation, a reward and a termination flag.
//!
//! ## Layers
//!
//! ```text
//! TimeSeries -> Job, Node -> ClusterState -> scheduler -> ClusterEnv
//! ```
//!
//! Scenario generation and rendering are collaborators behind the
//! [`ScenarioGenerator`] and [`Renderer`] traits.

#![warn(clippy::all)]

pub mod action;
pub mod env;
pub mod error;
pub mod job;
pub mod node;
pub mod observation;
pub mod scheduler;
pub mod state;
pub mod timeseries;

pub use action::Action;
pub use env::{
    ClusterEnv, FixedScenario, Renderer, RewardConfig, ScenarioGenerator, StepOutcome, StepResult,
};
pub use error::{ClusterError, Result};
pub use job::{Job, JobStatus};
pub use node::Node;
pub use observation::{Frame, Observation};
pub use scheduler::{Admission, check_placement, place};
pub use state::{ClusterState, TickReport};
pub use timeseries::TimeSeries;
