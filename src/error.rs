//! Error types for trueno-track
//!
//! Backend errors surface unchanged through `?`; the experiment layer adds
//! no translation or retry.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// trueno-track error types
#[derive(Error, Debug)]
pub enum Error {
    /// Operation invoked on the base experiment contract
    #[error("`{0}` is not implemented for this experiment\nUse a backend-bound TrackedExperiment")]
    NotImplemented(&'static str),

    /// Unknown or deleted experiment id
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    /// Unknown run / recorder id
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Name or key collision in the backend
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Filter or order-by string rejected by the parser
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tracking backend failure not covered by another variant.
    ///
    /// `MemoryBackend` never raises it; backends talking to an external
    /// tracking service use it for connectivity and transport errors.
    #[error("Backend error: {0}")]
    Backend(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error while building search results
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
