//! Handlers for the `/auth/desktop` handoff endpoints.

use crate::extract::AuthUser;
use crate::{ApiError, ApiResult, AppState};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

/// Request body for `POST /auth/desktop/initiate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    /// Caller-chosen anti-forgery value, echoed back at exchange.
    pub state: Option<String>,
    /// Optional desktop callback; must use a private URI scheme.
    pub redirect_uri: Option<String>,
}

/// Request body for `POST /auth/desktop/exchange`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// POST /auth/desktop/initiate
///
/// Issue a one-time handoff code for the authenticated caller. The code
/// is always bound to the caller's own identity; the body cannot name a
/// different user.
pub async fn initiate(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<InitiateRequest>,
) -> ApiResult<Json<Value>> {
    let anti_forgery = body
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("state is required".to_string()))?;

    if let Some(uri) = &body.redirect_uri {
        validate_redirect_uri(uri)?;
    }

    let issued = state.issuer.issue(&auth.user_id, &anti_forgery, None).await?;

    Ok(Json(json!({
        "authCode": issued.code,
        "expiresIn": issued.expires_in,
    })))
}

/// POST /auth/desktop/exchange
///
/// Trade a code + state for identity and tokens. Every redemption
/// failure kind answers the same generic 401.
pub async fn exchange(
    State(state): State<AppState>,
    Json(body): Json<ExchangeRequest>,
) -> ApiResult<Json<Value>> {
    let code = body
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("code is required".to_string()))?;
    let anti_forgery = body
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("state is required".to_string()))?;

    let redemption = state.redeemer.redeem_full(&code, &anti_forgery).await?;

    // The code is consumed at this point; a mint failure must not tell
    // the caller to retry the same exchange.
    let tokens = state
        .tokens
        .mint(&redemption.user_id)
        .await
        .map_err(|e| ApiError::MintFailed(e.to_string()))?;

    let mut response = json!({
        "user": { "id": redemption.user_id },
        "tokens": tokens,
    });
    if let Some(session_data) = redemption.session_data {
        response["sessionData"] = session_data;
    }

    Ok(Json(response))
}

/// Desktop callbacks must use a private scheme; forwarding codes to a
/// web origin would reopen the interception window the one-time code
/// exists to close.
fn validate_redirect_uri(uri: &str) -> ApiResult<()> {
    let parsed = url::Url::parse(uri)
        .map_err(|_| ApiError::InvalidRequest("redirectUri is not a valid URI".to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Err(ApiError::InvalidRequest(
            "redirectUri must use a private URI scheme".to_string(),
        )),
        _ => Ok(()),
    }
}
