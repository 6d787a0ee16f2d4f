use quotes::Quote;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteListResponse {
    pub quotes: Vec<Quote>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

impl QuoteListResponse {
    /// The whole collection as a single page.
    pub fn all(quotes: Vec<Quote>) -> Self {
        let total = quotes.len();
        Self {
            quotes,
            total,
            skip: 0,
            limit: total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RateLimitedResponse {
    pub error: String,
    pub retry_after: u64,
}

// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
