//! Error types for tidal-sim.

use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can stop a simulation run.
#[derive(Debug, Error)]
pub enum Error {
    /// World parameters outside their domain
    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),

    /// Relay engine error
    #[error("Router error: {0}")]
    Router(#[from] tidal_router::Error),

    /// Scenario file could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
