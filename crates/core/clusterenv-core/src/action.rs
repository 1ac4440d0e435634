//! Controller actions and the flat integer encoding
//!
//! The flat space has `n_nodes * n_jobs + 1` entries. `0` advances time;
//! `k >= 1` places job `(k - 1) / n_nodes` on node `(k - 1) % n_nodes`.

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// What the controller asks the simulator to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Advance the clock by one tick
    Advance,
    /// Bind job `job` to node `node`
    Place { node: usize, job: usize },
}

impl Action {
    /// Size of the flat action space
    pub fn space_size(n_nodes: usize, n_jobs: usize) -> usize {
        n_nodes * n_jobs + 1
    }

    /// Decode a flat action integer
    pub fn decode(raw: usize, n_nodes: usize, n_jobs: usize) -> Result<Self> {
        let space = Self::space_size(n_nodes, n_jobs);
        if raw >= space {
            return Err(ClusterError::InvalidAction { action: raw, space });
        }
        if raw == 0 {
            return Ok(Action::Advance);
        }
        let k = raw - 1;
        Ok(Action::Place {
            node: k % n_nodes,
            job: k / n_nodes,
        })
    }

    /// Encode into the flat action integer
    pub fn encode(self, n_nodes: usize) -> usize {
        match self {
            Action::Advance => 0,
            Action::Place { node, job } => 1 + node + job * n_nodes,
        }
    }
}
