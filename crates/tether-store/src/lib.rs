//! Keyed TTL storage for one-time handoff codes.
//!
//! This crate defines the store contract the code redeemer relies on for
//! exactly-once redemption, plus two conforming implementations:
//! - [`MemoryCodeStore`]: process-local locked map (single-instance servers)
//! - [`RedisCodeStore`]: external Redis store using server-side GETDEL
//!
//! The contract deliberately exposes no plain `get`: the only read is the
//! atomic fetch-and-delete [`CodeStore::take_if_present`], so no caller can
//! accidentally reintroduce a get-then-delete race window.

mod error;
mod memory;
mod redis_store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryCodeStore;
pub use redis_store::RedisCodeStore;

use async_trait::async_trait;
use std::time::Duration;

/// Keyed value store with per-key expiry and atomic consume.
///
/// Entries become unreadable after their TTL elapses; eviction timing is
/// best-effort and callers must not treat it as the authority on expiry.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Atomically fetch and delete the entry for `key`.
    ///
    /// Returns `None` when the key was never stored, already consumed, or
    /// evicted by TTL. Under concurrent calls for the same key, at most one
    /// caller observes the value.
    async fn take_if_present(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete the entry for `key` before its TTL elapses.
    ///
    /// Returns `true` if an entry was present and removed. Same atomicity
    /// as [`take_if_present`](CodeStore::take_if_present).
    async fn revoke(&self, key: &str) -> StoreResult<bool>;
}
