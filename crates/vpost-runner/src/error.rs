//! Error types for worker supervision.

use thiserror::Error;

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while supervising a worker invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start worker: {0}")]
    Spawn(String),

    #[error("worker timed out after {0} seconds")]
    Timeout(u64),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("failed to parse worker output: {0}")]
    OutputParse(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] vpost_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
