use crate::domain::{Quote, QuoteList};
use crate::ports::QuotesUpstream;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("invalid upstream payload: {0}")]
    Decode(String),
}

/// reqwest client for the remote quotes API.
#[derive(Clone, Debug)]
pub struct HttpQuotesUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuotesUpstream {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl QuotesUpstream for HttpQuotesUpstream {
    async fn fetch_all(&self) -> Result<Vec<Quote>, UpstreamError> {
        let list: QuoteList = self.get_json("/quotes").await?;
        Ok(list.quotes)
    }

    async fn fetch_random(&self) -> Result<Quote, UpstreamError> {
        self.get_json("/quotes/random").await
    }

    async fn fetch_by_id(&self, id: u64) -> Result<Quote, UpstreamError> {
        self.get_json(&format!("/quotes/{}", id)).await
    }
}
