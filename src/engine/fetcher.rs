//! HTTP fetching of search result pages

use crate::config::FetcherConfig;
use crate::error::{RankCheckError, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

/// A fetched page: HTTP status and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport used by the extractors
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedPage>;
}

/// reqwest-backed fetcher with a browser user agent and cookie jar
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(&FetcherConfig::default())
    }

    pub fn with_config(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RankCheckError::FetchError {
                url: "client_init".to_string(),
                source: e,
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchedPage> {
        info!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RankCheckError::FetchError {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RankCheckError::FetchError {
                url: url.to_string(),
                source: e,
            })?;

        debug!("Fetched {} bytes from {} (status {})", body.len(), url, status);
        Ok(FetchedPage { status, body })
    }
}
