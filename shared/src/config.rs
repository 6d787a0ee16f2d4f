use crate::{Error, Result, TtlMs};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Request budget for one of the two rate limiters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimit {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Upstream quotes API base URL, without a trailing slash.
    pub api_url: String,
    /// Per-client admission control on this service's own routes.
    pub inbound: RateLimit,
    /// Process-wide pacing of calls to the upstream API.
    pub outbound: RateLimit,
    /// TTL for `quotes:all` and `quotes:id:<id>` entries.
    pub cache_duration: TtlMs,
    pub upstream_timeout: Duration,
    pub routes_prefix: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const DEFAULT_API_URL: &str = "https://dummyjson.com";
    const DEFAULT_MAX_REQUESTS: u32 = 30;
    const DEFAULT_WINDOW_SECS: u64 = 60;
    const DEFAULT_CACHE_MINUTES: u64 = 1440;
    const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_ROUTES_PREFIX: &str = "api/quotes";

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("QUOTES_API_URL").unwrap_or_else(|| {
            warn!(
                "QUOTES_API_URL not set, using {}",
                Self::DEFAULT_API_URL
            );
            Self::DEFAULT_API_URL.to_string()
        });
        let api_url = validate_url(&api_url)?;

        let inbound = RateLimit {
            max_requests: parse_or(
                &lookup,
                "QUOTES_API_RATE_LIMIT_MAX",
                Self::DEFAULT_MAX_REQUESTS,
            )?,
            window_secs: parse_or(
                &lookup,
                "QUOTES_API_RATE_LIMIT_WINDOW",
                Self::DEFAULT_WINDOW_SECS,
            )?,
        };
        let outbound = RateLimit {
            max_requests: parse_or(
                &lookup,
                "QUOTES_UPSTREAM_RATE_LIMIT_MAX",
                inbound.max_requests,
            )?,
            window_secs: parse_or(
                &lookup,
                "QUOTES_UPSTREAM_RATE_LIMIT_WINDOW",
                inbound.window_secs,
            )?,
        };
        if inbound.window_secs == 0 || outbound.window_secs == 0 {
            return Err(Error::Config(
                "rate limit window must be at least one second".to_string(),
            ));
        }

        let cache_minutes = parse_or(&lookup, "QUOTES_CACHE_DURATION", Self::DEFAULT_CACHE_MINUTES)?;
        let cache_duration = cache_minutes
            .checked_mul(60_000)
            .map(TtlMs)
            .ok_or_else(|| {
                Error::Config(format!(
                    "QUOTES_CACHE_DURATION of {} minutes is out of range",
                    cache_minutes
                ))
            })?;
        let timeout_secs = parse_or(
            &lookup,
            "QUOTES_UPSTREAM_TIMEOUT_SECS",
            Self::DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?;

        Ok(Self {
            host: lookup("QUOTES_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "QUOTES_HTTP_PORT", Self::DEFAULT_PORT)?,
            api_url,
            inbound,
            outbound,
            cache_duration,
            upstream_timeout: Duration::from_secs(timeout_secs),
            routes_prefix: lookup("QUOTES_ROUTES_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| Self::DEFAULT_ROUTES_PREFIX.to_string()),
            allowed_origins: lookup("QUOTES_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn validate_url(raw: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(raw)
        .map_err(|e| Error::Config(format!("invalid QUOTES_API_URL '{}': {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "QUOTES_API_URL must be http(s), got '{}'",
            parsed.scheme()
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}
