//! Store error types.

use thiserror::Error;

/// Error type for code store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or answered abnormally.
    /// Transient; callers may retry the whole operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
