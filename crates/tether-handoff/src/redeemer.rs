//! Code redemption.

use crate::{CodeRecord, RedeemError};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tether_store::CodeStore;
use tracing::{info, warn};

/// What a successful redemption yields.
#[derive(Debug, Clone)]
pub struct Redemption {
    /// The identity the code was bound to at issuance.
    pub user_id: String,
    /// The forwarded session payload, when the code was a bridge token.
    pub session_data: Option<Value>,
}

/// Atomically consumes handoff codes and validates them.
///
/// A code is consumed on the very first attempt whatever the outcome —
/// a failed state check is treated as possible interception and burns
/// the code rather than allowing further guesses. Only a store error
/// leaves the code live.
pub struct CodeRedeemer {
    store: Arc<dyn CodeStore>,
}

impl CodeRedeemer {
    /// Create a redeemer over the given store.
    pub fn new(store: Arc<dyn CodeStore>) -> Self {
        Self { store }
    }

    /// Redeem a code, returning the bound user identity.
    pub async fn redeem(&self, code: &str, state: &str) -> Result<String, RedeemError> {
        self.redeem_full(code, state).await.map(|r| r.user_id)
    }

    /// Redeem a code, returning identity plus any forwarded session payload.
    ///
    /// Checks run in a fixed order after the atomic take: expiry against
    /// wall clock (the store's own TTL sweep is an optimization, not the
    /// authority), then state equality.
    pub async fn redeem_full(&self, code: &str, state: &str) -> Result<Redemption, RedeemError> {
        let raw = self
            .store
            .take_if_present(code)
            .await?
            .ok_or(RedeemError::NotFound)?;

        let record: CodeRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                // Corrupt entry; it is consumed either way.
                warn!(error = %err, "Undecodable code record, treating as not found");
                return Err(RedeemError::NotFound);
            }
        };

        // A record that survived deletion but was already marked used is
        // terminal, same as an absent one.
        if record.used_at.is_some() {
            return Err(RedeemError::NotFound);
        }

        if record.is_expired(Utc::now()) {
            return Err(RedeemError::Expired);
        }

        if record.state != state {
            warn!("Handoff state mismatch, code burned");
            return Err(RedeemError::StateMismatch);
        }

        info!(user_id = %record.user_id, "Handoff code redeemed");
        Ok(Redemption {
            user_id: record.user_id,
            session_data: record.session_data,
        })
    }
}
