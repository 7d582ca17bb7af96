//! Code issuance.

use crate::{generate_code, BridgeContext, CodeRecord, HandoffResult, IssuedCode};
use std::sync::Arc;
use std::time::Duration;
use tether_store::CodeStore;
use tracing::{debug, info};

/// Issues one-time handoff codes bound to a user and a state value.
///
/// `user_id` must be the authenticated caller's own identity; the HTTP
/// layer enforces that by deriving it from the bearer token rather than
/// the request body.
pub struct CodeIssuer {
    store: Arc<dyn CodeStore>,
    default_ttl: Duration,
}

impl CodeIssuer {
    /// Create an issuer over the given store with the given default TTL.
    pub fn new(store: Arc<dyn CodeStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Issue a plain auth code.
    ///
    /// `state` is stored verbatim and only ever compared for equality at
    /// redemption. The only failure is a store write error.
    pub async fn issue(
        &self,
        user_id: &str,
        state: &str,
        ttl: Option<Duration>,
    ) -> HandoffResult<IssuedCode> {
        self.issue_record(CodeRecord::new(
            user_id,
            state,
            ttl.unwrap_or(self.default_ttl),
        ))
        .await
    }

    /// Issue a bridge token: an auth code carrying an opaque session
    /// payload and request audit fields for the realtime-bootstrap flow.
    pub async fn issue_bridge(
        &self,
        user_id: &str,
        state: &str,
        context: BridgeContext,
        ttl: Option<Duration>,
    ) -> HandoffResult<IssuedCode> {
        let mut record = CodeRecord::new(user_id, state, ttl.unwrap_or(self.default_ttl));
        record.session_data = context.session_data;
        record.client_ip = context.client_ip;
        record.user_agent = context.user_agent;
        self.issue_record(record).await
    }

    /// Burn an issued-but-unredeemed code before its TTL elapses.
    ///
    /// Returns `true` if a live code was removed.
    pub async fn revoke(&self, code: &str) -> HandoffResult<bool> {
        let removed = self.store.revoke(code).await?;
        if removed {
            info!("Revoked handoff code");
        }
        Ok(removed)
    }

    async fn issue_record(&self, record: CodeRecord) -> HandoffResult<IssuedCode> {
        let code = generate_code();
        let ttl = (record.expires_at - record.created_at)
            .to_std()
            .unwrap_or(self.default_ttl);
        let payload = serde_json::to_string(&record)?;

        self.store.put(&code, payload, ttl).await?;
        debug!(user_id = %record.user_id, ttl_secs = ttl.as_secs(), "Issued handoff code");

        Ok(IssuedCode {
            code,
            expires_at: record.expires_at,
            expires_in: ttl.as_secs(),
        })
    }
}
