//! Admission: check and commit a job-to-node placement
//!
//! A placement is feasible when the job is queued (pending and arrived) and
//! the node has at least the job's demand free at every resource dimension
//! and every offset of the job's duration, with demand offset 0 aligned to
//! the node's offset 0. The full predicate is evaluated before anything is
//! mutated, so a rejected placement leaves the state untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::job::JobStatus;
use crate::state::ClusterState;

/// Result of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Admission {
    /// The job was (or would be) bound to the node
    Placed,
    /// The job is not in the queue: already placed, completed, or not yet arrived
    NotQueued { status: JobStatus, arrival_tick: u64 },
    /// The node lacks free capacity at some cell of the demand window
    InsufficientCapacity {
        resource: usize,
        offset: usize,
        required: f64,
        available: f64,
    },
}

impl Admission {
    pub fn is_placed(&self) -> bool {
        matches!(self, Admission::Placed)
    }
}

/// Evaluate a placement without mutating anything.
///
/// Out-of-range indices are errors; infeasibility is an [`Admission`] value.
pub fn check_placement(state: &ClusterState, node_index: usize, job_index: usize) -> Result<Admission> {
    let node = state.node(node_index)?;
    let job = state.job(job_index)?;

    if !job.is_queued(state.current_time()) {
        return Ok(Admission::NotQueued {
            status: job.status(),
            arrival_tick: job.arrival_tick,
        });
    }

    let capacity = node.capacity();
    let demand = job.demand();
    Ok(match capacity.first_shortfall(demand, job.duration()) {
        Some((resource, offset)) => Admission::InsufficientCapacity {
            resource,
            offset,
            required: demand.get(resource, offset),
            available: capacity.get(resource, offset),
        },
        None => Admission::Placed,
    })
}

/// Check a placement and, if feasible, commit it: charge the node's capacity
/// over the job's duration and mark the job running on that node.
pub fn place(state: &mut ClusterState, node_index: usize, job_index: usize) -> Result<Admission> {
    let admission = check_placement(state, node_index, job_index)?;
    if !admission.is_placed() {
        debug!(node = node_index, job = job_index, ?admission, "placement rejected");
        return Ok(admission);
    }

    let now = state.current_time();
    let job = &mut state.jobs[job_index];
    state.nodes[node_index].reserve(job.demand(), job.duration());
    job.admit(node_index, now);

    debug!(
        node = node_index,
        job = job_index,
        duration = job.duration(),
        tick = now,
        "job placed"
    );
    Ok(admission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;
    use crate::job::Job;
    use crate::node::Node;
    use crate::state::tests::single_job_state;

    #[test]
    fn test_place_charges_capacity() {
        let mut state = single_job_state();

        let admission = place(&mut state, 0, 0).unwrap();
        assert_eq!(admission, Admission::Placed);
        assert_eq!(state.nodes()[0].capacity().row(0), vec![6.0, 6.0, 6.0]);
        assert_eq!(state.jobs()[0].status(), JobStatus::Running);
        assert_eq!(state.jobs()[0].assigned_node(), Some(0));

        // Second attempt on the same job: no longer queued
        let again = place(&mut state, 0, 0).unwrap();
        assert!(matches!(
            again,
            Admission::NotQueued {
                status: JobStatus::Running,
                ..
            }
        ));
        assert_eq!(state.nodes()[0].capacity().row(0), vec![6.0, 6.0, 6.0]);
    }

    #[test]
    fn test_oversized_job_leaves_state_untouched() {
        let nodes = vec![Node::uniform(0, 1, 10.0, 1).unwrap()];
        let jobs = vec![Job::from_rows(0, 0, &[vec![11.0]], 1).unwrap()];
        let mut state = ClusterState::new(nodes, jobs, 1, 1).unwrap();
        let before = state.clone();

        let admission = place(&mut state, 0, 0).unwrap();
        assert_eq!(
            admission,
            Admission::InsufficientCapacity {
                resource: 0,
                offset: 0,
                required: 11.0,
                available: 10.0,
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_shortfall_late_in_window_is_atomic() {
        // Fits in dimension 0 everywhere, fails dimension 1 at offset 2
        let nodes = vec![Node::new(0, vec![10.0, 5.0], 4).unwrap()];
        let jobs = vec![
            Job::from_rows(0, 0, &[vec![1.0, 1.0, 1.0], vec![1.0, 1.0, 1.0]], 4).unwrap(),
            Job::from_rows(1, 0, &[vec![2.0, 2.0, 2.0], vec![1.0, 1.0, 5.0]], 4).unwrap(),
        ];
        let mut state = ClusterState::new(nodes, jobs, 2, 4).unwrap();
        assert!(place(&mut state, 0, 0).unwrap().is_placed());
        let before = state.clone();

        let admission = place(&mut state, 0, 1).unwrap();
        assert!(matches!(
            admission,
            Admission::InsufficientCapacity {
                resource: 1,
                offset: 2,
                ..
            }
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn test_capacity_beyond_duration_is_unchanged() {
        let nodes = vec![
            Node::uniform(0, 1, 10.0, 4).unwrap(),
            Node::uniform(1, 1, 10.0, 4).unwrap(),
        ];
        let jobs = vec![Job::from_rows(0, 0, &[vec![3.0, 2.0]], 4).unwrap()];
        let mut state = ClusterState::new(nodes, jobs, 1, 4).unwrap();

        place(&mut state, 1, 0).unwrap();
        assert_eq!(state.nodes()[1].capacity().row(0), vec![7.0, 8.0, 10.0, 10.0]);
        assert_eq!(state.nodes()[0].capacity().row(0), vec![10.0; 4]);
    }

    #[test]
    fn test_job_not_yet_arrived() {
        let nodes = vec![Node::uniform(0, 1, 10.0, 3).unwrap()];
        let jobs = vec![Job::from_rows(0, 2, &[vec![1.0]], 3).unwrap()];
        let mut state = ClusterState::new(nodes, jobs, 1, 3).unwrap();

        assert!(!place(&mut state, 0, 0).unwrap().is_placed());
        state.tick();
        state.tick();
        assert!(place(&mut state, 0, 0).unwrap().is_placed());
    }

    #[test]
    fn test_out_of_range_indices_are_errors() {
        let mut state = single_job_state();
        assert_eq!(
            place(&mut state, 1, 0),
            Err(ClusterError::NodeIndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(
            check_placement(&state, 0, 5),
            Err(ClusterError::JobIndexOutOfRange { index: 5, len: 1 })
        );
    }
}
