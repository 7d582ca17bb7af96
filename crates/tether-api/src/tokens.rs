//! In-process token issuer for single-instance deployments and tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tether_handoff::{HandoffResult, TokenIssuer, TokenPair};

/// Access token lifetime in seconds.
const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

struct MintedToken {
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// Token issuer that mints opaque random tokens and resolves them from an
/// in-memory table. Production deployments inject their real auth stack
/// instead.
#[derive(Default)]
pub struct LocalTokenIssuer {
    access_tokens: Mutex<HashMap<String, MintedToken>>,
}

impl LocalTokenIssuer {
    /// Create an empty issuer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an access token for a user (tests and bootstrap).
    pub fn seed(&self, access_token: &str, user_id: &str) {
        let mut tokens = self.access_tokens.lock().unwrap();
        tokens.insert(
            access_token.to_string(),
            MintedToken {
                user_id: user_id.to_string(),
                expires_at: Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            },
        );
    }
}

#[async_trait]
impl TokenIssuer for LocalTokenIssuer {
    async fn mint(&self, user_id: &str) -> HandoffResult<TokenPair> {
        let access_token = uuid::Uuid::new_v4().simple().to_string();
        let refresh_token = uuid::Uuid::new_v4().simple().to_string();

        let mut tokens = self.access_tokens.lock().unwrap();
        tokens.insert(
            access_token.clone(),
            MintedToken {
                user_id: user_id.to_string(),
                expires_at: Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            },
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: ACCESS_TOKEN_TTL_SECS as u64,
        })
    }

    async fn resolve(&self, access_token: &str) -> HandoffResult<Option<String>> {
        let tokens = self.access_tokens.lock().unwrap();
        Ok(tokens
            .get(access_token)
            .filter(|t| t.expires_at > Utc::now())
            .map(|t| t.user_id.clone()))
    }
}
