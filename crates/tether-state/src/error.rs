//! State persistence error types.

use thiserror::Error;

/// Error type for session state persistence.
#[derive(Error, Debug)]
pub enum StateError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using StateError.
pub type StateResult<T> = Result<T, StateError>;
