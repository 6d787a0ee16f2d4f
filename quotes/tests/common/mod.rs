#![allow(dead_code)]

use async_trait::async_trait;
use quotes::Quote;
use quotes::ports::QuotesUpstream;
use quotes::upstream::UpstreamError;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn quote(id: u64) -> Quote {
    Quote {
        id,
        text: format!("Quote number {}", id),
        author: format!("Author {}", id),
    }
}

/// In-process stand-in for the quotes API that counts every call.
#[derive(Default)]
pub struct FakeUpstream {
    quotes: Mutex<Vec<Quote>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeUpstream {
    pub fn with_quotes(quotes: Vec<Quote>) -> Self {
        Self {
            quotes: Mutex::new(quotes),
            ..Default::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<Vec<Quote>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status(503));
        }
        Ok(self.quotes.lock().unwrap().clone())
    }
}

#[async_trait]
impl QuotesUpstream for FakeUpstream {
    async fn fetch_all(&self) -> Result<Vec<Quote>, UpstreamError> {
        self.begin()
    }

    async fn fetch_random(&self) -> Result<Quote, UpstreamError> {
        self.begin()?
            .into_iter()
            .next()
            .ok_or(UpstreamError::Status(404))
    }

    async fn fetch_by_id(&self, id: u64) -> Result<Quote, UpstreamError> {
        self.begin()?
            .into_iter()
            .find(|q| q.id == id)
            .ok_or(UpstreamError::Status(404))
    }
}
