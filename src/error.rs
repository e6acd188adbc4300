//! Error types for the ACO engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcoError {
    /// Invalid configuration; the optimizer must not start serving
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Path exploration was asked to start from a resource the graph
    /// has never seen
    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    /// Best-effort telemetry write failed
    #[error("telemetry write failed: {0}")]
    Telemetry(String),
}

pub type Result<T> = std::result::Result<T, AcoError>;
