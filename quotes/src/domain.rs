use serde::{Deserialize, Serialize};

/// A single quotation as served by the upstream API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: u64,
    #[serde(rename = "quote")]
    pub text: String,
    pub author: String,
}

/// Envelope returned by `GET {base}/quotes`.
#[derive(Clone, Debug, Deserialize)]
pub struct QuoteList {
    pub quotes: Vec<Quote>,
}

/// Whether a value was served locally or had to be fetched upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fetched<T> {
    pub value: T,
    pub status: CacheStatus,
}

impl<T> Fetched<T> {
    pub fn hit(value: T) -> Self {
        Self {
            value,
            status: CacheStatus::Hit,
        }
    }

    pub fn miss(value: T) -> Self {
        Self {
            value,
            status: CacheStatus::Miss,
        }
    }
}

/// Cache key families used by the proxy.
pub mod keys {
    use chrono::{DateTime, Utc};

    pub const ALL: &str = "quotes:all";
    pub const ID_KEYS: &str = "quotes:id-keys";
    pub const INDEX: &str = "quotes:index";

    pub fn by_id(id: u64) -> String {
        format!("quotes:id:{}", id)
    }

    /// Hourly bucket for random-quote snapshots, e.g. `quotes:random:2024-05-01-13`.
    pub fn random_bucket(at: DateTime<Utc>) -> String {
        format!("quotes:random:{}", at.format("%Y-%m-%d-%H"))
    }

    /// All 24 hourly buckets of the calendar day containing `at`.
    pub fn random_buckets_for_day(at: DateTime<Utc>) -> Vec<String> {
        let day = at.format("%Y-%m-%d");
        (0..24)
            .map(|hour| format!("quotes:random:{}-{:02}", day, hour))
            .collect()
    }
}
