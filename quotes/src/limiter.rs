use crate::ports::CacheStore;
use chrono::Utc;
use serde_json::Value;
use shared::config::RateLimit;
use shared::{Error, TtlMs};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Outcome of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32 },
    Rejected { retry_after: u64 },
}

/// Per-client admission control for inbound requests.
///
/// Counters live in the shared [`CacheStore`] rather than in this struct, so
/// every handler sees the same attempts. `<key>` holds the hit count and
/// `<key>:timer` the unix time at which the window resets; both expire with
/// the window. A failing store admits the request.
#[derive(Clone)]
pub struct InboundRateLimiter {
    store: Arc<dyn CacheStore>,
}

impl InboundRateLimiter {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn timer_key(key: &str) -> String {
        format!("{}:timer", key)
    }

    pub async fn too_many_attempts(&self, key: &str, max_attempts: u32) -> bool {
        if self.attempts(key).await >= i64::from(max_attempts) {
            match self.store.exists(&Self::timer_key(key)).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    warn!("Rate limiter store unavailable for '{}': {}", key, e);
                    return false;
                }
            }
            self.reset_attempts(key).await;
        }
        false
    }

    /// Count one attempt, opening a window of `window` if none is running.
    pub async fn hit(&self, key: &str, window: Duration) -> i64 {
        let ttl = TtlMs(window.as_millis() as u64);
        let available_at = Utc::now().timestamp() + window.as_secs() as i64;

        if let Err(e) = self
            .store
            .add(&Self::timer_key(key), Value::from(available_at), ttl)
            .await
        {
            warn!("Failed to start rate limit window for '{}': {}", key, e);
        }

        match self.store.increment(key, ttl).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Failed to count attempt for '{}': {}", key, e);
                0
            }
        }
    }

    pub async fn attempts(&self, key: &str) -> i64 {
        match self.store.get(key).await {
            Ok(value) => value.as_i64().unwrap_or(0),
            Err(Error::NotFound) => 0,
            Err(e) => {
                warn!("Rate limiter store unavailable for '{}': {}", key, e);
                0
            }
        }
    }

    /// Seconds until the current window for `key` resets.
    pub async fn available_in(&self, key: &str) -> u64 {
        match self.store.get(&Self::timer_key(key)).await {
            Ok(value) => {
                let available_at = value.as_i64().unwrap_or(0);
                (available_at - Utc::now().timestamp()).max(0) as u64
            }
            Err(_) => 0,
        }
    }

    pub async fn remaining(&self, key: &str, max_attempts: u32) -> u32 {
        let left = i64::from(max_attempts) - self.attempts(key).await;
        left.max(0) as u32
    }

    pub async fn reset_attempts(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!("Failed to reset attempts for '{}': {}", key, e);
        }
    }

    /// Check-then-hit for one request. A rejected attempt is not counted.
    pub async fn attempt(&self, key: &str, limit: RateLimit) -> Admission {
        if self.too_many_attempts(key, limit.max_requests).await {
            // Never advertise an immediate retry while the window is still open.
            let retry_after = self.available_in(key).await.max(1);
            return Admission::Rejected { retry_after };
        }

        self.hit(key, limit.window()).await;
        Admission::Admitted {
            remaining: self.remaining(key, limit.max_requests).await,
        }
    }
}

impl std::fmt::Debug for InboundRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundRateLimiter")
            .field("store", &"<dyn CacheStore>")
            .finish()
    }
}
