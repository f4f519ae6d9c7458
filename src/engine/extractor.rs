//! Candidate extraction from search result pages

use crate::engine::dialect::Dialect;
use crate::engine::fetcher::PageFetcher;
use crate::error::{RankCheckError, Result};
use crate::models::RankCheckQuery;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// One search result encountered during a scan, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    /// 0-based position in scan order
    pub position: usize,
    /// Rendered text of the result's citation element; extractors that can
    /// surface results without one leave it empty
    pub citation: Option<String>,
}

impl RawCandidate {
    pub fn new(position: usize, citation: Option<String>) -> Self {
        Self { position, citation }
    }
}

/// Produces the candidates of one rank check, in page order
#[async_trait]
pub trait SearchResultExtractor: Send + Sync {
    /// At most `query.maximum_records` candidates; transport and parse
    /// failures abort the scan
    async fn extract_candidates(&self, query: &RankCheckQuery) -> Result<Vec<RawCandidate>>;
}

/// Extractor that scrapes HTML result pages following a [`Dialect`]
pub struct ScrapingExtractor {
    dialect: Dialect,
    fetcher: Arc<dyn PageFetcher>,
}

impl ScrapingExtractor {
    pub fn new(dialect: Dialect, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { dialect, fetcher }
    }

    async fn fetch_blocks(&self, url: &str) -> Result<Vec<String>> {
        let page = self.fetcher.get(url).await?;
        if !page.is_success() {
            return Err(RankCheckError::HttpStatusError {
                url: url.to_string(),
                status: page.status,
            });
        }
        self.dialect.parse_blocks(&page.body)
    }
}

#[async_trait]
impl SearchResultExtractor for ScrapingExtractor {
    async fn extract_candidates(&self, query: &RankCheckQuery) -> Result<Vec<RawCandidate>> {
        let limit = query.candidate_limit();
        let mut citations: Vec<String> = Vec::new();
        let mut page = 1u32;
        let mut pages_fetched = 0u32;

        while citations.len() < limit {
            let url = self.dialect.page_url(query, page)?;
            let blocks = self.fetch_blocks(url.as_str()).await?;
            pages_fetched += 1;
            if blocks.is_empty() {
                debug!("Page {} of {} returned no results", page, self.dialect.kind);
                break;
            }

            citations.extend(blocks);
            if self.dialect.is_single_request() {
                break;
            }
            page += 1;
        }

        // Pages come in fixed-size batches, so the last one may overshoot
        citations.truncate(limit);

        info!(
            "Scanned {} {} candidates over {} page(s)",
            citations.len(),
            self.dialect.kind,
            pages_fetched
        );

        Ok(citations
            .into_iter()
            .enumerate()
            .map(|(position, citation)| RawCandidate::new(position, Some(citation)))
            .collect())
    }
}
