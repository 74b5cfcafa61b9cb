use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::domain::error::GatewayError;

/// Shared key/value primitive backing the idempotency lock and the
/// circuit breaker's cross-instance state (spec §4.3, §4.5, §5). A real
/// deployment points this at Redis or similar; the wire protocol is out
/// of scope (spec §1 Non-goals) — only the operations the rest of the
/// system needs are exposed here.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GatewayError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), GatewayError>;

    /// Sets `key` to `value` only if absent, returning `true` if this
    /// call won the race — the building block for the idempotency
    /// store's single-flight lock (spec §4.3).
    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool, GatewayError>;

    async fn delete(&self, key: &str) -> Result<(), GatewayError>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// In-process reference cache. Single-instance only — fine for tests
/// and the reference deployment; a multi-instance deployment needs a
/// real shared store (spec §6).
#[derive(Default)]
pub struct InMemoryCache {
    store: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry) -> bool {
        entry.expires_at.map(|at| Instant::now() < at).unwrap_or(true)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GatewayError> {
        let mut store = self.store.lock().unwrap();
        match store.get(key) {
            Some(entry) if Self::is_live(entry) => Ok(Some(entry.value.clone())),
            Some(_) => {
                store.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), GatewayError> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.store.lock().unwrap().insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool, GatewayError> {
        let mut store = self.store.lock().unwrap();
        if let Some(entry) = store.get(key) {
            if Self::is_live(entry) {
                return Ok(false);
            }
        }
        let expires_at = ttl.map(|d| Instant::now() + d);
        store.insert(key.to_string(), Entry { value, expires_at });
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.store.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn set_if_absent_wins_only_once() {
        let cache = InMemoryCache::new();
        assert!(cache.set_if_absent("lock", b"a".to_vec(), None).await.unwrap());
        assert!(!cache.set_if_absent("lock", b"b".to_vec(), None).await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let cache = InMemoryCache::new();
        cache
            .set("k", b"v".to_vec(), Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), None).await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
