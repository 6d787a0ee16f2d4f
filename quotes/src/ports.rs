use crate::domain::Quote;
use crate::upstream::UpstreamError;
use async_trait::async_trait;
use serde_json::Value;
use shared::{Result, TtlMs};

// Ports are the pluggable extension points for the cache backend and the upstream API

/// Port for the shared TTL keyed store holding every cached artifact.
///
/// `get` returns `Error::NotFound` for absent or expired keys; any other error
/// means the store itself is unavailable.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn get(&self, key: &str) -> Result<Value>;
    /// Insert or overwrite `key`.
    async fn put(&self, key: &str, value: Value, ttl: TtlMs) -> Result<()>;
    /// Insert only if `key` is absent. Returns whether the value was stored.
    async fn add(&self, key: &str, value: Value, ttl: TtlMs) -> Result<bool>;
    /// Atomically add one to a counter. An absent key starts at 1 and lives for
    /// `ttl`; an existing key keeps its expiry.
    async fn increment(&self, key: &str, ttl: TtlMs) -> Result<i64>;
    /// Idempotent. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Port for the remote quotations API.
#[async_trait]
pub trait QuotesUpstream: Send + Sync + 'static {
    async fn fetch_all(&self) -> std::result::Result<Vec<Quote>, UpstreamError>;
    async fn fetch_random(&self) -> std::result::Result<Quote, UpstreamError>;
    async fn fetch_by_id(&self, id: u64) -> std::result::Result<Quote, UpstreamError>;
}
