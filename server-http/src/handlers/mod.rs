pub mod health;
pub mod quotes;

pub use health::health_check;
pub use quotes::{clear_cache, list_quotes, random_quote, show_quote, unknown_quote};
