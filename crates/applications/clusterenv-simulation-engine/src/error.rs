//! Error types for the simulation engine

use clusterenv_core::ClusterError;
use thiserror::Error;

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while configuring or running simulations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Simulator contract violation
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown controller name
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),
}

impl EngineError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
