use crate::api::RateLimitedResponse;
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use quotes::Admission;
use std::net::SocketAddr;

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Client identity for rate limiting: the peer IP, or `unknown` when the
/// server was not started with connect info.
fn client_key(request: &Request) -> String {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!("quotes_api:{}", client)
}

/// Inbound rate limiting middleware
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request);
    let limit = state.inbound;

    match state.limiter.attempt(&key, limit).await {
        Admission::Rejected { retry_after } => {
            tracing::warn!("Rate limit exceeded for '{}', retry in {}s", key, retry_after);
            too_many_requests(limit.max_requests, retry_after)
        }
        Admission::Admitted { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit.max_requests));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
    }
}

fn too_many_requests(max_requests: u32, retry_after: u64) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            (header::RETRY_AFTER, retry_after.to_string()),
            (HeaderName::from_static(X_RATELIMIT_LIMIT), max_requests.to_string()),
            (HeaderName::from_static(X_RATELIMIT_REMAINING), "0".to_string()),
        ],
        Json(RateLimitedResponse {
            error: "Too many requests. Please try again later.".to_string(),
            retry_after,
        }),
    )
        .into_response()
}
