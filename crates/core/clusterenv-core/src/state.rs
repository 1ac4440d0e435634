//! Cluster state: the fixed set of nodes and jobs and the clock
//!
//! [`ClusterState`] is the single mutable resource of an episode. Only the
//! scheduler ([`crate::scheduler::place`]) and [`ClusterState::tick`] mutate
//! it; everything else reads through copied views.

use ndarray::{Array3, s};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::action::Action;
use crate::error::{ClusterError, Result};
use crate::job::{Job, JobStatus};
use crate::node::Node;
use crate::observation::Observation;
use crate::scheduler;

/// Outcome of a single [`ClusterState::tick`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Clock value after the tick
    pub time: u64,
    /// Indices of jobs that completed on this tick
    pub completed: Vec<usize>,
}

/// Nodes, jobs and the current tick.
///
/// Serializes like any snapshot, but deserializes through
/// [`ClusterState::new`], so only initial states at tick 0 load back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClusterStateRecord")]
pub struct ClusterState {
    resource_dims: usize,
    horizon: usize,
    current_time: u64,
    pub(crate) nodes: Vec<Node>,
    pub(crate) jobs: Vec<Job>,
}

impl ClusterState {
    /// Accept a generated initial state after validating its invariants.
    ///
    /// Every node must be at nominal capacity with a `resource_dims x horizon`
    /// grid; every job must be pending, unassigned, arrive within
    /// `[0, horizon]` and carry a demand grid of the same shape.
    pub fn new(nodes: Vec<Node>, jobs: Vec<Job>, resource_dims: usize, horizon: usize) -> Result<Self> {
        if horizon == 0 {
            return Err(ClusterError::malformed("horizon must be at least 1"));
        }
        if resource_dims == 0 {
            return Err(ClusterError::malformed("at least one resource dimension is required"));
        }
        if nodes.is_empty() {
            return Err(ClusterError::malformed("cluster has no nodes"));
        }
        for node in &nodes {
            node.validate_initial(resource_dims, horizon)?;
        }
        for job in &jobs {
            job.validate_initial(resource_dims, horizon)?;
        }

        debug!(
            nodes = nodes.len(),
            jobs = jobs.len(),
            resource_dims,
            horizon,
            "cluster state accepted"
        );

        Ok(ClusterState {
            resource_dims,
            horizon,
            current_time: 0,
            nodes,
            jobs,
        })
    }

    pub fn resource_dims(&self) -> usize {
        self.resource_dims
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_jobs(&self) -> usize {
        self.jobs.len()
    }

    pub fn node(&self, index: usize) -> Result<&Node> {
        self.nodes.get(index).ok_or(ClusterError::NodeIndexOutOfRange {
            index,
            len: self.nodes.len(),
        })
    }

    pub fn job(&self, index: usize) -> Result<&Job> {
        self.jobs.get(index).ok_or(ClusterError::JobIndexOutOfRange {
            index,
            len: self.jobs.len(),
        })
    }

    /// Indices of jobs visible to the controller (pending and arrived)
    pub fn queued_jobs(&self) -> Vec<usize> {
        self.jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.is_queued(self.current_time))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn queue_length(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.is_queued(self.current_time))
            .count()
    }

    /// `n_jobs x resource_dims x horizon` demand, zero for every job that is
    /// not currently queued. Recomputed on each call.
    pub fn queue(&self) -> Array3<f64> {
        let mut queue = Array3::zeros((self.jobs.len(), self.resource_dims, self.horizon));
        for (j, job) in self.jobs.iter().enumerate() {
            if job.is_queued(self.current_time) {
                queue.slice_mut(s![j, .., ..]).assign(job.demand().as_array());
            }
        }
        queue
    }

    /// `n_nodes x resource_dims x horizon` free capacity
    pub fn usage(&self) -> Array3<f64> {
        let mut usage = Array3::zeros((self.nodes.len(), self.resource_dims, self.horizon));
        for (n, node) in self.nodes.iter().enumerate() {
            usage.slice_mut(s![n, .., ..]).assign(node.capacity().as_array());
        }
        usage
    }

    pub fn jobs_status(&self) -> Vec<JobStatus> {
        self.jobs.iter().map(Job::status).collect()
    }

    /// True iff every job has completed
    pub fn all_jobs_complete(&self) -> bool {
        self.jobs.iter().all(|job| job.status().is_terminal())
    }

    /// Snapshot of the state for the controller
    pub fn observe(&self) -> Observation {
        Observation {
            queue: self.queue(),
            usage: self.usage(),
            capacity: self.usage(),
            jobs_status: self.jobs_status(),
            queued: self
                .jobs
                .iter()
                .map(|job| job.is_queued(self.current_time))
                .collect(),
            current_time: self.current_time,
        }
    }

    /// Mask over the flat action space: entry 0 (advance) is always true,
    /// entry `k` is true iff decoding `k` yields a feasible placement.
    pub fn valid_actions(&self) -> Vec<bool> {
        let n_nodes = self.nodes.len();
        let mut mask = vec![false; Action::space_size(n_nodes, self.jobs.len())];
        mask[0] = true;
        for job_index in self.queued_jobs() {
            for node_index in 0..n_nodes {
                let feasible = scheduler::check_placement(self, node_index, job_index)
                    .map(|admission| admission.is_placed())
                    .unwrap_or(false);
                if feasible {
                    let action = Action::Place {
                        node: node_index,
                        job: job_index,
                    };
                    mask[action.encode(n_nodes)] = true;
                }
            }
        }
        mask
    }

    /// Advance the clock by one tick.
    ///
    /// Every node forecast rolls forward with a fresh nominal slot at the
    /// horizon, every running job drops its consumed offset (completing if
    /// nothing remains), then the clock increments.
    pub fn tick(&mut self) -> TickReport {
        let next = self.current_time + 1;

        for node in &mut self.nodes {
            node.roll_forward();
        }

        let mut completed = Vec::new();
        for (index, job) in self.jobs.iter_mut().enumerate() {
            if job.advance(next) {
                debug!(job = job.id, node = ?job.assigned_node(), tick = next, "job completed");
                completed.push(index);
            }
        }

        self.current_time = next;
        trace!(
            tick = next,
            queued = self.queue_length(),
            completed = completed.len(),
            "tick"
        );

        TickReport {
            time: next,
            completed,
        }
    }
}

#[derive(Deserialize)]
struct ClusterStateRecord {
    resource_dims: usize,
    horizon: usize,
    current_time: u64,
    nodes: Vec<Node>,
    jobs: Vec<Job>,
}

impl TryFrom<ClusterStateRecord> for ClusterState {
    type Error = ClusterError;

    fn try_from(record: ClusterStateRecord) -> Result<Self> {
        if record.current_time != 0 {
            return Err(ClusterError::malformed(format!(
                "stored state is at tick {}, only initial states can be loaded",
                record.current_time
            )));
        }
        ClusterState::new(record.nodes, record.jobs, record.resource_dims, record.horizon)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One node, capacity 10 over 3 offsets, one job demanding [4, 4, 4]
    pub(crate) fn single_job_state() -> ClusterState {
        let nodes = vec![Node::uniform(0, 1, 10.0, 3).unwrap()];
        let jobs = vec![Job::from_rows(0, 0, &[vec![4.0, 4.0, 4.0]], 3).unwrap()];
        ClusterState::new(nodes, jobs, 1, 3).unwrap()
    }

    #[test]
    fn test_state_rejects_malformed_input() {
        let nodes = vec![Node::uniform(0, 1, 10.0, 3).unwrap()];
        let wrong_shape = vec![Job::from_rows(0, 0, &[vec![1.0]], 4).unwrap()];
        assert!(ClusterState::new(nodes.clone(), wrong_shape, 1, 3).is_err());
        assert!(ClusterState::new(vec![], vec![], 1, 3).is_err());
        assert!(ClusterState::new(nodes, vec![], 1, 0).is_err());
    }

    #[test]
    fn test_queue_masks_future_and_placed_jobs() {
        let nodes = vec![Node::uniform(0, 1, 10.0, 3).unwrap()];
        let jobs = vec![
            Job::from_rows(0, 0, &[vec![2.0]], 3).unwrap(),
            Job::from_rows(1, 2, &[vec![3.0]], 3).unwrap(),
        ];
        let mut state = ClusterState::new(nodes, jobs, 1, 3).unwrap();

        let queue = state.queue();
        assert_eq!(queue.dim(), (2, 1, 3));
        assert_eq!(queue[[0, 0, 0]], 2.0);
        assert_eq!(queue[[1, 0, 0]], 0.0);
        assert_eq!(state.queue_length(), 1);

        scheduler::place(&mut state, 0, 0).unwrap();
        state.tick();
        state.tick();

        let queue = state.queue();
        assert_eq!(queue[[0, 0, 0]], 0.0);
        assert_eq!(queue[[1, 0, 0]], 3.0);
        assert_eq!(state.queued_jobs(), vec![1]);
    }

    #[test]
    fn test_tick_rolls_capacity_and_completes_jobs() {
        let mut state = single_job_state();
        assert!(scheduler::place(&mut state, 0, 0).unwrap().is_placed());
        assert_eq!(state.nodes()[0].capacity().row(0), vec![6.0, 6.0, 6.0]);

        let report = state.tick();
        assert_eq!(report.time, 1);
        assert!(report.completed.is_empty());
        assert_eq!(state.nodes()[0].capacity().row(0), vec![6.0, 6.0, 10.0]);

        state.tick();
        let report = state.tick();
        assert_eq!(report.completed, vec![0]);
        assert_eq!(state.current_time(), 3);
        assert_eq!(state.jobs()[0].status(), JobStatus::Completed);
        assert_eq!(state.nodes()[0].capacity().row(0), vec![10.0, 10.0, 10.0]);
        assert!(state.all_jobs_complete());
    }

    #[test]
    fn test_valid_actions_mask() {
        let nodes = vec![
            Node::uniform(0, 1, 10.0, 2).unwrap(),
            Node::uniform(1, 1, 3.0, 2).unwrap(),
        ];
        let jobs = vec![
            Job::from_rows(0, 0, &[vec![5.0]], 2).unwrap(),
            Job::from_rows(1, 1, &[vec![1.0]], 2).unwrap(),
        ];
        let state = ClusterState::new(nodes, jobs, 1, 2).unwrap();

        // action = 1 + node + job * n_nodes
        assert_eq!(state.valid_actions(), vec![true, true, false, false, false]);
    }

    fn load_edited(
        edit: impl FnOnce(&mut serde_json::Value),
    ) -> std::result::Result<ClusterState, serde_json::Error> {
        let mut json = serde_json::to_value(single_job_state()).unwrap();
        edit(&mut json);
        serde_json::from_value(json)
    }

    #[test]
    fn test_load_initial_state_from_json() {
        assert_eq!(load_edited(|_| {}).unwrap(), single_job_state());
    }

    #[test]
    fn test_load_rejects_edited_state() {
        let running = load_edited(|json| json["jobs"][0]["status"] = serde_json::json!("Running"));
        assert!(running.is_err());

        let negative = load_edited(|json| {
            json["nodes"][0]["capacity"]["values"]["data"][0] = serde_json::json!(-5.0)
        });
        assert!(negative.is_err());

        let no_duration = load_edited(|json| json["jobs"][0]["duration"] = serde_json::json!(0));
        assert!(no_duration.unwrap_err().to_string().contains("demand extent"));

        let later = load_edited(|json| json["current_time"] = serde_json::json!(2));
        assert!(later.is_err());

        let wider = load_edited(|json| json["horizon"] = serde_json::json!(4));
        assert!(wider.is_err());
    }

    #[test]
    fn test_loaded_state_charges_full_demand() {
        let mut state = load_edited(|_| {}).unwrap();
        assert!(scheduler::place(&mut state, 0, 0).unwrap().is_placed());
        assert_eq!(state.nodes()[0].capacity().row(0), vec![6.0, 6.0, 6.0]);
    }

    #[test]
    fn test_observation_queued_includes_zero_demand_jobs() {
        let nodes = vec![Node::uniform(0, 1, 10.0, 2).unwrap()];
        let jobs = vec![
            Job::from_rows(0, 0, &[vec![]], 2).unwrap(),
            Job::from_rows(1, 1, &[vec![1.0]], 2).unwrap(),
        ];
        let state = ClusterState::new(nodes, jobs, 1, 2).unwrap();

        let obs = state.observe();
        assert_eq!(obs.queued, vec![true, false]);
        assert!(obs.queue.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_observation_is_a_copy() {
        let state = single_job_state();
        let mut obs = state.observe();
        obs.usage.fill(0.0);
        obs.queue.fill(99.0);
        assert_eq!(state.nodes()[0].capacity().row(0), vec![10.0; 3]);
        assert_eq!(state.queue()[[0, 0, 0]], 4.0);
    }

    #[test]
    fn test_empty_job_list_is_complete() {
        let nodes = vec![Node::uniform(0, 1, 1.0, 1).unwrap()];
        let state = ClusterState::new(nodes, vec![], 1, 1).unwrap();
        assert!(state.all_jobs_complete());
    }
}
