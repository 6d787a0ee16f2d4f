#![deny(clippy::all)]

pub mod domain;
pub mod index;
pub mod limiter;
pub mod ports;
pub mod proxy;
pub mod throttle;
pub mod upstream;

pub use domain::{CacheStatus, Fetched, Quote};
pub use index::SortedQuoteIndex;
pub use limiter::{Admission, InboundRateLimiter};
pub use proxy::{QuoteOperations, QuoteProxyService};
pub use throttle::OutboundThrottle;
pub use upstream::{HttpQuotesUpstream, UpstreamError};
