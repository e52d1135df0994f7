//! Read-through cache for lookup endpoints.
//!
//! The cache is a best-effort accelerator, never a source of truth: a miss
//! or eviction only changes latency, and writes always land in the
//! authoritative store first, then invalidate (never update) the affected
//! keys. The [`Cache`] trait is injected as `Arc<dyn Cache>` so tests can
//! substitute their own instance.

pub mod keys;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use memory::MemoryCache;

/// Key-value cache over JSON values with per-entry TTLs.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the cached value if present and unexpired.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Stores a value under `key` for `ttl`.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration);

    /// Drops the given keys. Missing keys are ignored.
    async fn del_many(&self, keys: &[String]);
}

/// Returns the cached value for `key`, or invokes `loader`, caches its
/// result with `ttl`, and returns it.
///
/// Loader errors propagate unchanged and nothing is cached for them. A
/// cached value that no longer deserializes is treated as a miss.
pub async fn get_or_set<T, E, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Duration,
    loader: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(value) = cache.get(key).await
        && let Ok(cached) = serde_json::from_value(value)
    {
        metrics::counter!("cache_hits_total").increment(1);
        return Ok(cached);
    }
    metrics::counter!("cache_misses_total").increment(1);

    let fresh = loader().await?;
    match serde_json::to_value(&fresh) {
        Ok(value) => cache.set(key, value, ttl).await,
        Err(e) => tracing::warn!(key, error = %e, "value not cacheable"),
    }
    Ok(fresh)
}
