//! Handoff error types.

use thiserror::Error;

/// Error type for code issuance.
#[derive(Error, Debug)]
pub enum HandoffError {
    /// The code store could not be reached. Transient; retryable.
    #[error(transparent)]
    Store(#[from] tether_store::StoreError),

    /// A record failed to serialize.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using HandoffError.
pub type HandoffResult<T> = Result<T, HandoffError>;

/// Why a redemption attempt failed.
///
/// Callers must handle the kinds distinctly; the HTTP boundary is the
/// only place `NotFound`/`Expired`/`StateMismatch` collapse to one
/// generic response.
#[derive(Error, Debug)]
pub enum RedeemError {
    /// Never issued, already redeemed, or evicted by the store.
    #[error("Code not found")]
    NotFound,

    /// Found, but its `expires_at` has passed.
    #[error("Code expired")]
    Expired,

    /// Found and live, but the presented state does not match the one
    /// supplied at issuance. The code is consumed anyway.
    #[error("State mismatch")]
    StateMismatch,

    /// The store could not be reached; the code was NOT consumed and the
    /// caller may retry.
    #[error(transparent)]
    Store(#[from] tether_store::StoreError),
}
