//! Integration tests for the quote HTTP routes.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use quotes::ports::{CacheStore, QuotesUpstream};
use quotes::{InboundRateLimiter, OutboundThrottle, Quote, QuoteProxyService, UpstreamError};
use serde_json::{json, Value};
use server_http::{build_router, AppState};
use shared::config::Config;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use storage_engine::MokaCache;
use tower::ServiceExt;

#[derive(Default)]
struct FakeUpstream {
    quotes: Vec<Quote>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeUpstream {
    fn begin(&self) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(UpstreamError::Status(500))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QuotesUpstream for FakeUpstream {
    async fn fetch_all(&self) -> Result<Vec<Quote>, UpstreamError> {
        self.begin()?;
        Ok(self.quotes.clone())
    }

    async fn fetch_random(&self) -> Result<Quote, UpstreamError> {
        self.begin()?;
        self.quotes.last().cloned().ok_or(UpstreamError::Status(404))
    }

    async fn fetch_by_id(&self, id: u64) -> Result<Quote, UpstreamError> {
        self.begin()?;
        self.quotes
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or(UpstreamError::Status(404))
    }
}

fn quote(id: u64, text: &str) -> Quote {
    Quote {
        id,
        text: text.to_string(),
        author: format!("Author {}", id),
    }
}

struct TestServer {
    router: Router,
    upstream: Arc<FakeUpstream>,
}

async fn server_with(vars: &[(&str, &str)]) -> TestServer {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

    let store: Arc<dyn CacheStore> = Arc::new(MokaCache::new_unbounded("routes-test"));
    let upstream = Arc::new(FakeUpstream {
        quotes: vec![quote(1, "First quote"), quote(2, "Second quote")],
        ..Default::default()
    });
    let proxy = QuoteProxyService::new(
        store.clone(),
        upstream.clone(),
        Arc::new(OutboundThrottle::new(config.outbound)),
        config.cache_duration,
    )
    .await;

    let state = AppState::new(
        Arc::new(proxy),
        Arc::new(InboundRateLimiter::new(store)),
        config.inbound,
    );

    TestServer {
        router: build_router(state, &config),
        upstream,
    }
}

async fn server() -> TestServer {
    server_with(&[]).await
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Value,
}

impl TestResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

async fn send(router: &Router, method: &str, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

#[tokio::test]
async fn test_list_quotes_miss_then_hit() {
    let server = server().await;

    let first = send(&server.router, "GET", "/api/quotes").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("x-cache"), Some("MISS"));
    assert_eq!(first.body["total"], 2);
    assert_eq!(first.body["skip"], 0);
    assert_eq!(first.body["limit"], 2);
    assert_eq!(
        first.body["quotes"][0],
        json!({"id": 1, "quote": "First quote", "author": "Author 1"})
    );

    let second = send(&server.router, "GET", "/api/quotes").await;
    assert_eq!(second.header("x-cache"), Some("HIT"));
    assert_eq!(second.body, first.body);
    assert_eq!(server.upstream.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_show_quote_then_served_locally() {
    let server = server().await;

    let first = send(&server.router, "GET", "/api/quotes/2").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("x-cache"), Some("MISS"));
    assert_eq!(first.body["quote"], "Second quote");

    let second = send(&server.router, "GET", "/api/quotes/2").await;
    assert_eq!(second.header("x-cache"), Some("HIT"));
    assert_eq!(second.body, first.body);
    assert_eq!(server.upstream.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_quote_is_404() {
    let server = server().await;

    let response = send(&server.router, "GET", "/api/quotes/999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_non_numeric_id_is_404_without_upstream_call() {
    let server = server().await;

    let response = send(&server.router, "GET", "/api/quotes/abc").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(server.upstream.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_get_on_clear_cache_path_is_404() {
    let server = server().await;

    let response = send(&server.router, "GET", "/api/quotes/clear-cache").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"].is_string());
    assert_eq!(server.upstream.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_random_quote() {
    let server = server().await;

    let response = send(&server.router, "GET", "/api/quotes/random").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], 2);
    assert!(response.header("x-cache").is_some());

    server.upstream.failing.store(true, Ordering::SeqCst);
    let failed = send(&server.router, "GET", "/api/quotes/random").await;
    assert_eq!(failed.status, StatusCode::NOT_FOUND);
    assert!(failed.body["error"].is_string());
}

#[tokio::test]
async fn test_upstream_failure_lists_nothing() {
    let server = server().await;
    server.upstream.failing.store(true, Ordering::SeqCst);

    let response = send(&server.router, "GET", "/api/quotes").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 0);
    assert_eq!(response.header("x-cache"), Some("MISS"));
}

#[tokio::test]
async fn test_clear_cache_forces_next_list_upstream() {
    let server = server().await;
    send(&server.router, "GET", "/api/quotes").await;

    let cleared = send(&server.router, "POST", "/api/quotes/clear-cache").await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert_eq!(cleared.body["success"], true);
    assert!(cleared.body["message"].is_string());

    let after = send(&server.router, "GET", "/api/quotes").await;
    assert_eq!(after.header("x-cache"), Some("MISS"));
    assert_eq!(server.upstream.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_third_request_in_window_is_rate_limited() {
    let server = server_with(&[
        ("QUOTES_API_RATE_LIMIT_MAX", "2"),
        ("QUOTES_API_RATE_LIMIT_WINDOW", "60"),
    ])
    .await;

    let first = send(&server.router, "GET", "/api/quotes").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("x-ratelimit-limit"), Some("2"));
    assert_eq!(first.header("x-ratelimit-remaining"), Some("1"));

    let second = send(&server.router, "GET", "/api/quotes/1").await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.header("x-ratelimit-remaining"), Some("0"));

    let third = send(&server.router, "GET", "/api/quotes").await;
    assert_eq!(third.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(third.body["error"].is_string());
    let retry_after = third.body["retry_after"].as_u64().unwrap();
    assert!(retry_after > 0);
    assert_eq!(third.header("retry-after"), Some(retry_after.to_string().as_str()));
    assert_eq!(third.header("x-ratelimit-limit"), Some("2"));
    assert_eq!(third.header("x-ratelimit-remaining"), Some("0"));
}

#[tokio::test]
async fn test_health_is_not_rate_limited() {
    let server = server_with(&[("QUOTES_API_RATE_LIMIT_MAX", "1")]).await;

    for _ in 0..3 {
        let response = send(&server.router, "GET", "/health").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["message"], "OK");
        assert!(response.header("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn test_custom_routes_prefix() {
    let server = server_with(&[("QUOTES_ROUTES_PREFIX", "v1/quotes")]).await;

    assert_eq!(send(&server.router, "GET", "/v1/quotes").await.status, StatusCode::OK);
    assert_eq!(
        send(&server.router, "GET", "/api/quotes").await.status,
        StatusCode::NOT_FOUND
    );
}
