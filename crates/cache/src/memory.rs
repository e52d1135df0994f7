//! In-memory TTL cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::Cache;

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Process-local cache backed by a map with per-entry expiry.
///
/// Expired entries are dropped lazily on read; there is no background
/// sweeper.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet pruned) entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: prune under the write lock.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key)
            && entry.expires_at <= Instant::now()
        {
            entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn del_many(&self, keys: &[String]) {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let cache = MemoryCache::new();
        cache
            .set("k", serde_json::json!({"n": 1}), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await, Some(serde_json::json!({"n": 1})));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", serde_json::json!(1), Duration::from_secs(30))
            .await;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get("k").await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").await.is_none());
        // The expired entry was pruned, not just hidden.
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn del_many_removes_only_named_keys() {
        let cache = MemoryCache::new();
        cache
            .set("users:all", serde_json::json!([]), Duration::from_secs(60))
            .await;
        cache
            .set("users:7", serde_json::json!({}), Duration::from_secs(60))
            .await;
        cache
            .set("users:8", serde_json::json!({}), Duration::from_secs(60))
            .await;

        cache
            .del_many(&["users:all".to_string(), "users:7".to_string()])
            .await;
        assert!(cache.get("users:all").await.is_none());
        assert!(cache.get("users:7").await.is_none());
        assert!(cache.get("users:8").await.is_some());
    }

    #[tokio::test]
    async fn overwrite_replaces_value_and_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", serde_json::json!(1), Duration::from_secs(60))
            .await;
        cache
            .set("k", serde_json::json!(2), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await, Some(serde_json::json!(2)));
        assert_eq!(cache.len().await, 1);
    }
}
