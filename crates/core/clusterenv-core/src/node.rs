//! Compute nodes with a rolling capacity forecast

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::timeseries::TimeSeries;

/// A node's free capacity per resource dimension over the forecast window.
///
/// Deserialization only accepts a node at full nominal capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord")]
pub struct Node {
    pub id: usize,
    /// Nominal maximum per resource dimension
    nominal: Vec<f64>,
    capacity: TimeSeries,
}

impl Node {
    /// Create a node at full nominal capacity across `horizon` offsets
    pub fn new(id: usize, nominal: Vec<f64>, horizon: usize) -> Result<Self> {
        check_nominal(id, &nominal)?;
        let capacity = TimeSeries::filled(&nominal, horizon);
        Ok(Node {
            id,
            nominal,
            capacity,
        })
    }

    /// Create a node with the same nominal capacity in every dimension
    pub fn uniform(id: usize, resource_dims: usize, level: f64, horizon: usize) -> Result<Self> {
        Node::new(id, vec![level; resource_dims], horizon)
    }

    pub fn nominal(&self) -> &[f64] {
        &self.nominal
    }

    pub fn capacity(&self) -> &TimeSeries {
        &self.capacity
    }

    /// Fraction of nominal capacity in use at offset 0, averaged over dimensions
    pub fn utilization_now(&self) -> f64 {
        let dims = self.nominal.len();
        if dims == 0 {
            return 0.0;
        }
        let used: f64 = self
            .nominal
            .iter()
            .enumerate()
            .filter(|(_, max)| **max > 0.0)
            .map(|(r, max)| 1.0 - self.capacity.get(r, 0) / max)
            .sum();
        used / dims as f64
    }

    /// Charge `demand` over offsets `[0, duration)`. Callers must have
    /// checked feasibility first.
    pub(crate) fn reserve(&mut self, demand: &TimeSeries, duration: usize) {
        self.capacity.subtract_window(demand, duration);
    }

    /// Roll the forecast one offset forward, exposing a fresh nominal slot
    pub(crate) fn roll_forward(&mut self) {
        self.capacity.roll_forward(&self.nominal);
    }

    pub(crate) fn validate_initial(&self, resource_dims: usize, horizon: usize) -> Result<()> {
        check_nominal(self.id, &self.nominal)?;
        if self.capacity.shape() != (resource_dims, horizon) {
            return Err(ClusterError::shape(
                format!("node {} capacity", self.id),
                &[resource_dims, horizon],
                &[self.capacity.resource_dims(), self.capacity.horizon()],
            ));
        }
        if self.capacity != TimeSeries::filled(&self.nominal, horizon) {
            return Err(ClusterError::malformed(format!(
                "node {} must start at nominal capacity",
                self.id
            )));
        }
        Ok(())
    }
}

fn check_nominal(id: usize, nominal: &[f64]) -> Result<()> {
    match nominal.iter().find(|v| !v.is_finite() || **v < 0.0) {
        Some(&bad) => Err(ClusterError::value(format!("node {id} nominal capacity"), bad)),
        None => Ok(()),
    }
}

#[derive(Deserialize)]
struct NodeRecord {
    id: usize,
    nominal: Vec<f64>,
    capacity: TimeSeries,
}

impl TryFrom<NodeRecord> for Node {
    type Error = ClusterError;

    fn try_from(record: NodeRecord) -> Result<Self> {
        let node = Node {
            id: record.id,
            nominal: record.nominal,
            capacity: record.capacity,
        };
        node.validate_initial(node.nominal.len(), node.capacity.horizon())?;
        Ok(node)
    }
}
