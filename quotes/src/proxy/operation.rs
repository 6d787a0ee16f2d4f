use crate::domain::{Fetched, Quote};
use async_trait::async_trait;

/// Application-level quote operations
/// This is what the HTTP layer drives; lookups never fail, an upstream
/// problem surfaces as an empty list or `None`
#[async_trait]
pub trait QuoteOperations: Send + Sync + 'static {
    async fn list_all(&self) -> Fetched<Vec<Quote>>;

    async fn get_random(&self) -> Option<Fetched<Quote>>;

    async fn get_by_id(&self, id: u64) -> Option<Fetched<Quote>>;

    async fn clear_cache(&self);
}
