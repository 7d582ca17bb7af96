//! Sync error types.

use thiserror::Error;

/// Error type for realtime sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A publish did not reach the channel. Non-fatal: the local change
    /// still applies; callers log and move on, there is no retry.
    #[error("Channel publish failed: {0}")]
    PublishFailed(String),

    /// Channel subscription failed. The hosting application retries with
    /// backoff; the controller does not.
    #[error("Subscription failed: {0}")]
    Subscribe(String),

    /// Operation requires an active subscription.
    #[error("Not connected to channel")]
    NotConnected,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
