use crate::domain::{Fetched, Quote, keys};
use crate::index::SortedQuoteIndex;
use crate::ports::{CacheStore, QuotesUpstream};
use crate::proxy::operation::QuoteOperations;
use crate::throttle::OutboundThrottle;
use crate::upstream::UpstreamError;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, TtlMs};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Random-quote snapshots only dedup bursts within a few seconds.
const RANDOM_TTL: TtlMs = TtlMs::from_secs(5);
/// Shortest TTL of the id-key registry and the index snapshot.
const BOOKKEEPING_TTL: TtlMs = TtlMs::from_days(1);

/// Caching, self-throttling front for the upstream quotes API
///
/// The in-memory index is an accelerator; the cache store is the source of
/// truth for everything TTL-governed. Every write phase runs on its own task
/// so a cancelled request cannot leave half-written cache state behind.
#[derive(Clone)]
pub struct QuoteProxyService {
    store: Arc<dyn CacheStore>,
    upstream: Arc<dyn QuotesUpstream>,
    throttle: Arc<OutboundThrottle>,
    index: Arc<RwLock<SortedQuoteIndex>>,
    // Readers hold it shared; clear_cache holds it exclusively.
    gate: Arc<RwLock<()>>,
    cache_duration: TtlMs,
}

impl QuoteProxyService {
    /// Build the service, rehydrating the index from the `quotes:index` snapshot.
    pub async fn new(
        store: Arc<dyn CacheStore>,
        upstream: Arc<dyn QuotesUpstream>,
        throttle: Arc<OutboundThrottle>,
        cache_duration: TtlMs,
    ) -> Self {
        let index = match read_json::<Vec<Quote>>(store.as_ref(), keys::INDEX).await {
            Some(snapshot) => SortedQuoteIndex::from_snapshot(snapshot),
            None => SortedQuoteIndex::new(),
        };
        info!("Quote index hydrated with {} entries", index.len());

        Self {
            store,
            upstream,
            throttle,
            index: Arc::new(RwLock::new(index)),
            gate: Arc::new(RwLock::new(())),
            cache_duration,
        }
    }

    pub async fn indexed_len(&self) -> usize {
        self.index.read().await.len()
    }

    /// The registry must outlive every id entry it lists.
    fn bookkeeping_ttl(&self) -> TtlMs {
        TtlMs(BOOKKEEPING_TTL.0.max(self.cache_duration.0))
    }

    async fn forget(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!("Failed to remove cache key '{}': {}", key, e);
        }
    }

    async fn persist_index(&self, index: &SortedQuoteIndex) {
        let ttl = self.bookkeeping_ttl();
        write_json(self.store.as_ref(), keys::INDEX, &index.snapshot(), ttl).await;
    }

    async fn record_all(&self, quotes: Vec<Quote>) {
        let _gate = self.gate.read().await;
        let mut index = self.index.write().await;
        index.bulk_upsert(quotes.iter().cloned());
        write_json(self.store.as_ref(), keys::ALL, &quotes, self.cache_duration).await;
        self.persist_index(&index).await;
    }

    async fn record_quote(&self, quote: Quote) {
        let _gate = self.gate.read().await;
        let id_key = keys::by_id(quote.id);

        // Index, id entry, registry and snapshot change together under the write lock.
        let mut index = self.index.write().await;
        index.upsert(quote.clone());
        write_json(self.store.as_ref(), &id_key, &quote, self.cache_duration).await;

        let mut registry: Vec<String> = read_json(self.store.as_ref(), keys::ID_KEYS)
            .await
            .unwrap_or_default();
        if !registry.contains(&id_key) {
            registry.push(id_key);
        }
        let ttl = self.bookkeeping_ttl();
        write_json(self.store.as_ref(), keys::ID_KEYS, &registry, ttl).await;

        self.persist_index(&index).await;
    }

    async fn clear_all(&self) {
        let _gate = self.gate.write().await;

        self.forget(keys::ALL).await;
        for bucket in keys::random_buckets_for_day(Utc::now()) {
            self.forget(&bucket).await;
        }

        let registry: Vec<String> = read_json(self.store.as_ref(), keys::ID_KEYS)
            .await
            .unwrap_or_default();
        for key in &registry {
            self.forget(key).await;
        }
        self.forget(keys::ID_KEYS).await;

        self.index.write().await.clear();
        self.forget(keys::INDEX).await;

        info!("Quote cache cleared ({} id entries)", registry.len());
    }
}

/// Run `task` to completion even if the awaiting request is dropped.
async fn run_detached<F>(task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Err(e) = tokio::spawn(task).await {
        warn!("Cache write task failed: {}", e);
    }
}

/// Read and decode a cached value. Store failures and undecodable payloads
/// count as a miss.
async fn read_json<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> Option<T> {
    match store.get(key).await {
        Ok(value) => match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Discarding undecodable cache entry '{}': {}", key, e);
                None
            }
        },
        Err(Error::NotFound) => None,
        Err(e) => {
            warn!("Cache unavailable reading '{}', treating as miss: {}", key, e);
            None
        }
    }
}

async fn write_json<T: Serialize + Sync + ?Sized>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: TtlMs,
) {
    let value = match serde_json::to_value(value) {
        Ok(value) => value,
        Err(e) => {
            warn!("Skipping cache write for '{}': {}", key, Error::from(e));
            return;
        }
    };
    if let Err(e) = store.put(key, value, ttl).await {
        warn!("Cache unavailable writing '{}': {}", key, e);
    }
}

#[async_trait]
impl QuoteOperations for QuoteProxyService {
    async fn list_all(&self) -> Fetched<Vec<Quote>> {
        {
            let _gate = self.gate.read().await;
            if let Some(quotes) = read_json::<Vec<Quote>>(self.store.as_ref(), keys::ALL).await {
                debug!("Serving {} quotes from cache", quotes.len());
                return Fetched::hit(quotes);
            }
        }

        self.throttle.acquire().await;
        match self.upstream.fetch_all().await {
            Ok(quotes) => {
                let this = self.clone();
                let fetched = quotes.clone();
                run_detached(async move { this.record_all(fetched).await }).await;
                Fetched::miss(quotes)
            }
            Err(e) => {
                warn!("Failed to fetch quotes from upstream: {}", e);
                Fetched::miss(Vec::new())
            }
        }
    }

    async fn get_random(&self) -> Option<Fetched<Quote>> {
        let bucket = keys::random_bucket(Utc::now());
        let seen = {
            let _gate = self.gate.read().await;
            matches!(self.store.exists(&bucket).await, Ok(true))
        };

        self.throttle.acquire().await;
        match self.upstream.fetch_random().await {
            Ok(quote) => {
                {
                    let _gate = self.gate.read().await;
                    write_json(self.store.as_ref(), &bucket, &quote, RANDOM_TTL).await;
                }
                Some(if seen {
                    Fetched::hit(quote)
                } else {
                    Fetched::miss(quote)
                })
            }
            Err(e) => {
                warn!("Failed to fetch random quote from upstream: {}", e);
                None
            }
        }
    }

    async fn get_by_id(&self, id: u64) -> Option<Fetched<Quote>> {
        {
            let _gate = self.gate.read().await;
            if let Some(quote) = self.index.read().await.find(id).cloned() {
                debug!("Quote {} served from index", id);
                return Some(Fetched::hit(quote));
            }
            if let Some(quote) = read_json::<Quote>(self.store.as_ref(), &keys::by_id(id)).await {
                debug!("Quote {} served from cache", id);
                return Some(Fetched::hit(quote));
            }
        }

        self.throttle.acquire().await;
        match self.upstream.fetch_by_id(id).await {
            Ok(quote) => {
                let this = self.clone();
                let fetched = quote.clone();
                run_detached(async move { this.record_quote(fetched).await }).await;
                Some(Fetched::miss(quote))
            }
            Err(UpstreamError::Status(404)) => {
                info!("Quote {} does not exist upstream", id);
                None
            }
            Err(e) => {
                warn!("Failed to fetch quote {} from upstream: {}", id, e);
                None
            }
        }
    }

    async fn clear_cache(&self) {
        let this = self.clone();
        run_detached(async move { this.clear_all().await }).await;
    }
}

impl std::fmt::Debug for QuoteProxyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteProxyService")
            .field("cache_duration", &self.cache_duration)
            .field("throttle", &self.throttle)
            .finish()
    }
}
