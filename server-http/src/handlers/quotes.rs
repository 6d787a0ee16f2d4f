use crate::api::{ClearCacheResponse, ErrorResponse, QuoteListResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quotes::{CacheStatus, Fetched, Quote};
use tracing::info;

const X_CACHE: &str = "x-cache";

fn with_cache_status<T: IntoResponse>(status: CacheStatus, body: T) -> Response {
    ([(X_CACHE, status.as_str())], body).into_response()
}

fn quote_response(fetched: Option<Fetched<Quote>>, missing: &str) -> Response {
    match fetched {
        Some(fetched) => with_cache_status(fetched.status, Json(fetched.value)),
        None => (StatusCode::NOT_FOUND, Json(ErrorResponse::new(missing))).into_response(),
    }
}

/// GET /{prefix}
pub async fn list_quotes(State(state): State<AppState>) -> Response {
    info!("GET: all quotes");

    let fetched = state.quotes.list_all().await;
    with_cache_status(fetched.status, Json(QuoteListResponse::all(fetched.value)))
}

/// GET /{prefix}/random
pub async fn random_quote(State(state): State<AppState>) -> Response {
    info!("GET: random quote");

    quote_response(
        state.quotes.get_random().await,
        "Could not fetch a random quote",
    )
}

/// GET /{prefix}/{id}
pub async fn show_quote(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!("GET: quote id={}", id);

    // Only plain digit strings name a quote.
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return quote_response(None, "Quote not found");
    }
    let Ok(id) = id.parse::<u64>() else {
        return quote_response(None, "Quote not found");
    };

    quote_response(state.quotes.get_by_id(id).await, "Quote not found")
}

/// Any other method on a path that is not a quote id.
pub async fn unknown_quote() -> Response {
    quote_response(None, "Quote not found")
}

/// POST /{prefix}/clear-cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    info!("POST: clear quote cache");

    state.quotes.clear_cache().await;
    Json(ClearCacheResponse {
        success: true,
        message: "Quote cache cleared".to_string(),
    })
}
