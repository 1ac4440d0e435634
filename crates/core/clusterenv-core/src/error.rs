//! Error types for the cluster simulator

use thiserror::Error;

/// Simulator result type
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors raised by the simulator.
///
/// These are contract violations (bad indices, malformed scenarios). An
/// infeasible placement is not an error; see [`crate::scheduler::Admission`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// Node index outside `0..len`
    #[error("node index {index} out of range (cluster has {len} nodes)")]
    NodeIndexOutOfRange { index: usize, len: usize },

    /// Job index outside `0..len`
    #[error("job index {index} out of range (cluster has {len} jobs)")]
    JobIndexOutOfRange { index: usize, len: usize },

    /// Raw action integer outside the action space
    #[error("action {action} outside action space of size {space}")]
    InvalidAction { action: usize, space: usize },

    /// A grid or vector has the wrong shape
    #[error("{what}: expected shape {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A numeric value is negative or not finite
    #[error("{what}: invalid value {value}")]
    InvalidValue { what: String, value: f64 },

    /// Initial state violates a cluster invariant
    #[error("malformed cluster state: {0}")]
    MalformedState(String),

    /// Scenario generator failed to produce a state
    #[error("generator error: {0}")]
    Generator(String),
}

impl ClusterError {
    /// Create a shape mismatch error
    pub fn shape(what: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Create an invalid value error
    pub fn value(what: impl Into<String>, value: f64) -> Self {
        Self::InvalidValue {
            what: what.into(),
            value,
        }
    }

    /// Create a malformed state error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedState(msg.into())
    }

    /// Create a generator error
    pub fn generator(msg: impl Into<String>) -> Self {
        Self::Generator(msg.into())
    }
}
