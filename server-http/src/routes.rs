use crate::handlers;
use crate::middleware::rate_limit;
use crate::state::AppState;
use axum::{
    http::{HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use shared::config::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build and configure the application router
pub fn build_router(state: AppState, config: &Config) -> Router {
    let prefix = format!("/{}", config.routes_prefix);
    let base = prefix.trim_end_matches('/');

    // Quote routes sit behind the inbound rate limiter
    let quotes = Router::new()
        .route(&prefix, get(handlers::list_quotes))
        .route(&format!("{}/random", base), get(handlers::random_quote))
        .route(
            &format!("{}/clear-cache", base),
            post(handlers::clear_cache).fallback(handlers::unknown_quote),
        )
        .route(&format!("{}/{{id}}", base), get(handlers::show_quote))
        .route_layer(from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .merge(quotes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .expose_headers([
            HeaderName::from_static("x-cache"),
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderName::from_static("retry-after"),
        ]);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}
