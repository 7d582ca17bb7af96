//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tether_handoff::{HandoffError, RedeemError};

/// Generic message for every failed exchange. `NotFound`, `Expired`, and
/// `StateMismatch` are indistinguishable to the caller by design.
const GENERIC_EXCHANGE_ERROR: &str = "invalid or expired code";

/// Application-level error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed input; surfaces as 400 with field-level detail.
    #[error("Bad request: {0}")]
    InvalidRequest(String),

    /// Failed authentication or redemption; surfaces as a generic 401.
    #[error("Unauthorized")]
    Unauthorized,

    /// Transient infrastructure fault; surfaces as 500 and is safe for
    /// the caller to retry.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Token minting failed after the code was already consumed, so a
    /// retry of the same request can only 401. Surfaces as 500 telling
    /// the caller to restart the handoff from initiate.
    #[error("Token minting failed: {0}")]
    MintFailed(String),

    /// Anything else; surfaces as a sanitized 500.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<RedeemError> for ApiError {
    fn from(err: RedeemError) -> Self {
        match err {
            // Collapse the three kinds; the distinction stays in logs only.
            RedeemError::NotFound | RedeemError::Expired | RedeemError::StateMismatch => {
                tracing::debug!(kind = %err, "Redemption failed");
                ApiError::Unauthorized
            }
            RedeemError::Store(e) => ApiError::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<HandoffError> for ApiError {
    fn from(err: HandoffError) -> Self {
        match err {
            HandoffError::Store(e) => ApiError::StoreUnavailable(e.to_string()),
            HandoffError::Serialization(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                GENERIC_EXCHANGE_ERROR.to_string(),
            ),
            ApiError::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Code store unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_UNAVAILABLE",
                    "Temporary failure, retry the request".to_string(),
                )
            }
            ApiError::MintFailed(msg) => {
                tracing::error!(error = %msg, "Token minting failed after redemption");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MINT_FAILED",
                    "Could not issue tokens, restart the sign-in handoff".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
