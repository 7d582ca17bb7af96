//! Token issuer collaborator.

use crate::HandoffResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An access/refresh token pair. Opaque to this crate: no claim format
/// is assumed or inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// External collaborator that mints and resolves session tokens.
///
/// The handoff core never signs or verifies tokens itself; the hosting
/// application injects whatever implementation its auth stack provides.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Mint a token pair for a user identity.
    async fn mint(&self, user_id: &str) -> HandoffResult<TokenPair>;

    /// Resolve an access token back to a user identity, or `None` when
    /// the token is unknown or no longer valid.
    async fn resolve(&self, access_token: &str) -> HandoffResult<Option<String>>;
}
