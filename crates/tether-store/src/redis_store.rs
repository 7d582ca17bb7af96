//! Redis-backed code store.

use crate::{CodeStore, StoreResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Key namespace for handoff codes.
const KEY_PREFIX: &str = "tether:code:";

/// Code store backed by Redis.
///
/// `put` maps to `SET key value EX ttl`; `take_if_present` maps to
/// `GETDEL`, which deletes and returns in one server-side operation, so
/// the exactly-once guarantee holds across any number of server instances
/// sharing the store.
#[derive(Clone)]
pub struct RedisCodeStore {
    client: redis::Client,
}

impl RedisCodeStore {
    /// Create a store from a Redis URL (e.g. `redis://127.0.0.1:6379`).
    pub fn new(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self { client })
    }

    fn namespaced(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    async fn connection(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl CodeStore for RedisCodeStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        // EX takes whole seconds; a sub-second TTL still gets one second.
        let ttl_secs = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(Self::namespaced(key))
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<()>(&mut conn)
            .await?;
        debug!(ttl_secs, "Stored handoff code");
        Ok(())
    }

    async fn take_if_present(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(Self::namespaced(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn revoke(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("DEL")
            .arg(Self::namespaced(key))
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespacing() {
        assert_eq!(RedisCodeStore::namespaced("abc123"), "tether:code:abc123");
    }

    #[test]
    fn test_invalid_url_is_unavailable() {
        let result = RedisCodeStore::new("not-a-url");
        assert!(result.is_err());
    }
}
