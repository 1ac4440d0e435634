//! Jobs and their lifecycle

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::timeseries::TimeSeries;

/// Lifecycle status of a job.
///
/// Pending -> Running on a successful placement, Running -> Completed once
/// the remaining demand window drains. Completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        self == JobStatus::Completed
    }
}

/// A job with a fixed arrival tick and a demand profile over its duration.
///
/// Deserialization only accepts a pending job whose stored duration
/// matches its demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "JobRecord")]
pub struct Job {
    pub id: usize,
    pub arrival_tick: u64,
    /// `resource_dims x horizon`, zero-padded past `duration`
    demand: TimeSeries,
    duration: usize,
    status: JobStatus,
    assigned_node: Option<usize>,
    /// Demand still to be consumed while running; shifts with every tick
    remaining: TimeSeries,
    admitted_at: Option<u64>,
    completed_at: Option<u64>,
}

impl Job {
    /// Create a pending job. The duration is derived once from the demand.
    pub fn new(id: usize, arrival_tick: u64, demand: TimeSeries) -> Self {
        let (dims, horizon) = demand.shape();
        Job {
            id,
            arrival_tick,
            duration: demand.trailing_extent(),
            demand,
            status: JobStatus::Pending,
            assigned_node: None,
            remaining: TimeSeries::zeros(dims, horizon),
            admitted_at: None,
            completed_at: None,
        }
    }

    /// Create a pending job from per-resource demand rows, zero-padded to `horizon`
    pub fn from_rows(id: usize, arrival_tick: u64, rows: &[Vec<f64>], horizon: usize) -> Result<Self> {
        Ok(Job::new(id, arrival_tick, TimeSeries::from_rows(rows, horizon)?))
    }

    pub fn demand(&self) -> &TimeSeries {
        &self.demand
    }

    pub fn duration(&self) -> usize {
        self.duration
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn assigned_node(&self) -> Option<usize> {
        self.assigned_node
    }

    /// Demand not yet consumed; all zero unless running
    pub fn remaining(&self) -> &TimeSeries {
        &self.remaining
    }

    pub fn admitted_at(&self) -> Option<u64> {
        self.admitted_at
    }

    pub fn completed_at(&self) -> Option<u64> {
        self.completed_at
    }

    /// Pending and already arrived at `now`
    pub fn is_queued(&self, now: u64) -> bool {
        self.status == JobStatus::Pending && self.arrival_tick <= now
    }

    /// Ticks spent waiting in the queue before admission
    pub fn queueing_delay(&self) -> Option<u64> {
        self.admitted_at
            .map(|admitted| admitted.saturating_sub(self.arrival_tick))
    }

    /// Check the lifecycle invariants of a freshly generated job
    pub(crate) fn validate_initial(&self, resource_dims: usize, horizon: usize) -> Result<()> {
        if self.demand.shape() != (resource_dims, horizon) {
            return Err(ClusterError::shape(
                format!("job {} demand", self.id),
                &[resource_dims, horizon],
                &[self.demand.resource_dims(), self.demand.horizon()],
            ));
        }
        if self.demand.min() < 0.0 {
            return Err(ClusterError::value(
                format!("job {} demand", self.id),
                self.demand.min(),
            ));
        }
        if self.duration != self.demand.trailing_extent() {
            return Err(ClusterError::malformed(format!(
                "job {} duration {} does not match its demand extent {}",
                self.id,
                self.duration,
                self.demand.trailing_extent()
            )));
        }
        if self.status != JobStatus::Pending
            || self.assigned_node.is_some()
            || self.admitted_at.is_some()
            || self.completed_at.is_some()
        {
            return Err(ClusterError::malformed(format!(
                "job {} must start pending and unassigned",
                self.id
            )));
        }
        if self.remaining.shape() != self.demand.shape() || !self.remaining.is_zero() {
            return Err(ClusterError::malformed(format!(
                "job {} has remaining demand before admission",
                self.id
            )));
        }
        if self.arrival_tick > horizon as u64 {
            return Err(ClusterError::malformed(format!(
                "job {} arrives at tick {} beyond horizon {}",
                self.id, self.arrival_tick, horizon
            )));
        }
        Ok(())
    }

    /// Bind to a node at tick `now`
    pub(crate) fn admit(&mut self, node_index: usize, now: u64) {
        self.status = JobStatus::Running;
        self.assigned_node = Some(node_index);
        self.remaining = self.demand.clone();
        self.admitted_at = Some(now);
    }

    /// Consume offset 0 of the remaining window. Returns true if this tick
    /// completed the job.
    pub(crate) fn advance(&mut self, now: u64) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        let drained = vec![0.0; self.remaining.resource_dims()];
        self.remaining.roll_forward(&drained);
        if self.remaining.is_zero() {
            self.status = JobStatus::Completed;
            self.completed_at = Some(now);
            true
        } else {
            false
        }
    }
}

#[derive(Deserialize)]
struct JobRecord {
    id: usize,
    arrival_tick: u64,
    demand: TimeSeries,
    duration: usize,
    status: JobStatus,
    assigned_node: Option<usize>,
    remaining: TimeSeries,
    admitted_at: Option<u64>,
    completed_at: Option<u64>,
}

impl TryFrom<JobRecord> for Job {
    type Error = ClusterError;

    fn try_from(record: JobRecord) -> Result<Self> {
        let job = Job {
            id: record.id,
            arrival_tick: record.arrival_tick,
            demand: record.demand,
            duration: record.duration,
            status: record.status,
            assigned_node: record.assigned_node,
            remaining: record.remaining,
            admitted_at: record.admitted_at,
            completed_at: record.completed_at,
        };
        job.validate_initial(job.demand.resource_dims(), job.demand.horizon())?;
        Ok(job)
    }
}
