//! Observation snapshots handed to controllers and renderers
//!
//! Every field is an owned copy; mutating an observation never reaches the
//! simulator state.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::job::JobStatus;

/// Snapshot of a [`crate::state::ClusterState`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// `n_jobs x resource_dims x horizon`, zero unless the job is queued
    pub queue: Array3<f64>,
    /// `n_nodes x resource_dims x horizon` free capacity
    pub usage: Array3<f64>,
    /// Independent copy of the node capacities
    pub capacity: Array3<f64>,
    pub jobs_status: Vec<JobStatus>,
    /// Job `j` is pending and has arrived; true even when its demand is all zero
    pub queued: Vec<bool>,
    pub current_time: u64,
}

/// Everything a renderer draws for one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub observation: Observation,
    /// Placement rejected on the step that produced this frame, if any
    pub last_invalid_action: Option<Action>,
}
