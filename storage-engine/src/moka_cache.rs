use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use quotes::ports::CacheStore;
use serde_json::Value;
use shared::{Error, Result, TtlMs};
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// A stored value together with its absolute expiry.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: TtlMs) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl.as_duration(),
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// Expires each entry at its own `expires_at`, on insert and on update alike.
struct PerEntryExpiry;

impl Expiry<String, CacheEntry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(updated_at))
    }
}

/// Moka-based cache implementation with per-entry TTL
/// Provides lock-free, concurrent storage; expired entries are evicted by
/// moka and also rejected on read
pub struct MokaCache {
    cache: Cache<String, CacheEntry>,
}

impl MokaCache {
    /// Create a Moka cache from name and optional capacity
    pub fn new(name: &str, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(name).expire_after(PerEntryExpiry);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }

    /// Create a new unbounded Moka cache
    pub fn new_unbounded(name: &str) -> Self {
        Self::new(name, None)
    }

    async fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.get(key).await?;
        if entry.is_live() {
            Some(entry)
        } else {
            self.cache.invalidate(key).await;
            None
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheStore for MokaCache {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn get(&self, key: &str) -> Result<Value> {
        self.live_entry(key)
            .await
            .map(|entry| entry.value)
            .ok_or(Error::NotFound) // Either doesn't exist or TTL expired
    }

    async fn put(&self, key: &str, value: Value, ttl: TtlMs) -> Result<()> {
        self.cache
            .insert(key.to_string(), CacheEntry::new(value, ttl))
            .await;
        Ok(())
    }

    async fn add(&self, key: &str, value: Value, ttl: TtlMs) -> Result<bool> {
        // A lingering expired entry must not block the insert.
        self.live_entry(key).await;

        let entry = self
            .cache
            .entry(key.to_string())
            .or_insert_with(async move { CacheEntry::new(value, ttl) })
            .await;
        Ok(entry.is_fresh())
    }

    async fn increment(&self, key: &str, ttl: TtlMs) -> Result<i64> {
        let entry = self
            .cache
            .entry(key.to_string())
            .and_upsert_with(|existing| {
                let next = match existing.map(|e| e.into_value()) {
                    // Non-numeric values restart the count.
                    Some(current) if current.is_live() => CacheEntry {
                        value: Value::from(current.value.as_i64().unwrap_or(0) + 1),
                        expires_at: current.expires_at,
                    },
                    _ => CacheEntry::new(Value::from(1), ttl),
                };
                std::future::ready(next)
            })
            .await;

        entry
            .into_value()
            .value
            .as_i64()
            .ok_or_else(|| Error::Internal(format!("counter '{}' is not numeric", key)))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let existed = self
            .cache
            .remove(key)
            .await
            .is_some_and(|entry| entry.is_live());
        Ok(existed)
    }
}

impl Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
