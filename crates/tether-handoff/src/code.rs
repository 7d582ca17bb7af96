//! Handoff code records and generation.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Default TTL for issued codes (the only cancellation mechanism besides
/// explicit revoke).
pub const DEFAULT_CODE_TTL: Duration = Duration::from_secs(300);

/// Number of random bytes in a code (128 bits, hex-encoded to 32 chars).
const CODE_BYTES: usize = 16;

/// Generate a handoff code from the OS CSPRNG.
pub fn generate_code() -> String {
    let mut bytes = [0u8; CODE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// The record stored under a code in the TTL code store.
///
/// Plain auth codes leave the bridge fields empty; the realtime-bootstrap
/// flow fills `session_data` (and audit fields) so the redeeming client
/// receives the web session's snapshot alongside the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRecord {
    /// Identity the code is bound to.
    pub user_id: String,
    /// Caller-opaque anti-forgery value, compared verbatim at redemption.
    pub state: String,
    pub created_at: DateTime<Utc>,
    /// Authoritative expiry; store-level eviction is best-effort only.
    pub expires_at: DateTime<Utc>,
    /// Opaque payload forwarded to the new client (bridge flow).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_data: Option<Value>,
    /// IP of the issuing request, for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// User agent of the issuing request, for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Set exactly once at redemption. A present record with this set is
    /// as dead as a deleted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl CodeRecord {
    /// Create a record for a plain auth code.
    pub fn new(user_id: impl Into<String>, state: impl Into<String>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            user_id: user_id.into(),
            state: state.into(),
            created_at,
            expires_at: created_at + chrono::Duration::from_std(ttl).unwrap_or_default(),
            session_data: None,
            client_ip: None,
            user_agent: None,
            used_at: None,
        }
    }

    /// Whether the record's own deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Extra context captured when issuing a bridge token.
#[derive(Debug, Clone, Default)]
pub struct BridgeContext {
    /// Opaque session payload to forward to the redeeming client.
    pub session_data: Option<Value>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// What the issuer hands back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCode {
    /// The one-time code itself.
    pub code: String,
    pub expires_at: DateTime<Utc>,
    /// Seconds until expiry, for the HTTP response body.
    pub expires_in: u64,
}
