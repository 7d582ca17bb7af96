//! Process-local code store backed by a locked map.

use crate::{CodeStore, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A stored entry with its own expiry deadline.
#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process code store.
///
/// All operations take a single lock acquisition, so `take_if_present`
/// removes the entry in the same critical section that observes it —
/// two concurrent takes for the same key can never both succeed.
///
/// Expired entries are dropped lazily: on access, and opportunistically
/// swept on every `put`. Suitable for single-instance deployments only;
/// multi-instance servers need [`RedisCodeStore`](crate::RedisCodeStore).
#[derive(Debug, Default)]
pub struct MemoryCodeStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCodeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap();
        entries.values().filter(|e| e.expires_at > now).count()
    }

    /// Whether the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn take_if_present(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value)),
            // Expired entries read as absent; removal already happened.
            Some(_) | None => Ok(None),
        }
    }

    async fn revoke(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(key) {
            Some(entry) => Ok(entry.expires_at > now),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_put_then_take() {
        let store = MemoryCodeStore::new();
        store
            .put("abc123", "payload".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        let taken = store.take_if_present("abc123").await.unwrap();
        assert_eq!(taken, Some("payload".to_string()));
    }

    #[tokio::test]
    async fn test_take_consumes_entry() {
        let store = MemoryCodeStore::new();
        store
            .put("abc123", "payload".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        assert!(store.take_if_present("abc123").await.unwrap().is_some());
        assert!(store.take_if_present("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_take_unknown_key() {
        let store = MemoryCodeStore::new();
        assert!(store.take_if_present("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let store = MemoryCodeStore::new();
        store
            .put("short", "payload".to_string(), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.take_if_present("short").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_sweeps_expired_entries() {
        let store = MemoryCodeStore::new();
        store
            .put("short", "a".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        store
            .put("fresh", "b".to_string(), Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = MemoryCodeStore::new();
        store
            .put("abc123", "payload".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        assert!(store.revoke("abc123").await.unwrap());
        assert!(!store.revoke("abc123").await.unwrap());
        assert!(store.take_if_present("abc123").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_take_yields_exactly_one_winner() {
        let store = Arc::new(MemoryCodeStore::new());
        store
            .put("contested", "payload".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take_if_present("contested").await.unwrap() })
            })
            .collect();

        let results = join_all(tasks).await;
        let winners = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Some(_))))
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_overwrite_refreshes_value_and_ttl() {
        let store = MemoryCodeStore::new();
        store
            .put("key", "old".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        store
            .put("key", "new".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            store.take_if_present("key").await.unwrap(),
            Some("new".to_string())
        );
    }
}
