//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur when reading or writing the job store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("post not found: {0}")]
    PostNotFound(String),

    #[error("corrupt row: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}
