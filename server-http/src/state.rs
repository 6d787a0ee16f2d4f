use quotes::ports::CacheStore;
use quotes::{
    HttpQuotesUpstream, InboundRateLimiter, OutboundThrottle, QuoteOperations, QuoteProxyService,
};
use shared::config::{Config, RateLimit};
use std::sync::Arc;
use storage_engine::MokaCache;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub quotes: Arc<dyn QuoteOperations>,
    pub limiter: Arc<InboundRateLimiter>,
    pub inbound: RateLimit,
}

impl AppState {
    pub fn new(
        quotes: Arc<dyn QuoteOperations>,
        limiter: Arc<InboundRateLimiter>,
        inbound: RateLimit,
    ) -> Self {
        Self {
            quotes,
            limiter,
            inbound,
        }
    }

    /// Wire the moka store, the upstream client and the proxy from configuration.
    /// The proxy and the inbound limiter share one store.
    pub async fn from_config(config: &Config) -> shared::Result<Self> {
        let store: Arc<dyn CacheStore> = Arc::new(MokaCache::new_unbounded("quotes"));

        let upstream = HttpQuotesUpstream::new(&config.api_url, config.upstream_timeout)
            .map_err(|e| shared::Error::Config(format!("cannot build upstream client: {}", e)))?;
        let throttle = Arc::new(OutboundThrottle::new(config.outbound));

        let proxy = QuoteProxyService::new(
            store.clone(),
            Arc::new(upstream),
            throttle,
            config.cache_duration,
        )
        .await;
        tracing::info!("Quote proxy initialized: {:?}", proxy);

        Ok(Self::new(
            Arc::new(proxy),
            Arc::new(InboundRateLimiter::new(store)),
            config.inbound,
        ))
    }
}
