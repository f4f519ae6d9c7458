//! Rank checking engine
//!
//! This module provides:
//! - EngineSelector: resolves the search engine dialect from a search URL
//! - SearchResultExtractor: fetches result pages and yields raw candidates
//! - RankCheckEngine: filters candidates against the target website and ranks them

pub mod dialect;
pub mod extractor;
pub mod fetcher;
pub mod selector;

pub use dialect::{Dialect, Pagination};
pub use extractor::{RawCandidate, ScrapingExtractor, SearchResultExtractor};
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher};
pub use selector::{EngineSelector, ExtractorKind};

use crate::error::{RankCheckError, Result};
use crate::models::{Job, NewResultEntry, RankCheckQuery, RankedMatch};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Whether a candidate cites the target website (case-insensitive substring)
pub fn should_record(candidate: &RawCandidate, website_url: &str) -> bool {
    let website_url = website_url.trim().to_lowercase();
    match &candidate.citation {
        Some(citation) if !website_url.is_empty() => {
            citation.to_lowercase().contains(&website_url)
        }
        _ => false,
    }
}

/// Resolves an extractor for a query and turns its candidates into ranked matches
///
/// The engine holds no mutable state; persistence is the caller's concern.
pub struct RankCheckEngine {
    selector: EngineSelector,
    extractors: HashMap<ExtractorKind, Arc<dyn SearchResultExtractor>>,
}

impl RankCheckEngine {
    /// An engine with the given selector and no extractors registered
    pub fn new(selector: EngineSelector) -> Self {
        Self {
            selector,
            extractors: HashMap::new(),
        }
    }

    /// The default selector with a scraping extractor for every known dialect
    pub fn scraping(fetcher: Arc<dyn PageFetcher>) -> Self {
        [ExtractorKind::Google, ExtractorKind::Bing, ExtractorKind::Yahoo]
            .into_iter()
            .fold(Self::new(EngineSelector::default()), |engine, kind| {
                let extractor = ScrapingExtractor::new(Dialect::for_kind(kind), fetcher.clone());
                engine.with_extractor(kind, Arc::new(extractor))
            })
    }

    /// Register (or replace) the extractor used for a dialect
    pub fn with_extractor(
        mut self,
        kind: ExtractorKind,
        extractor: Arc<dyn SearchResultExtractor>,
    ) -> Self {
        self.extractors.insert(kind, extractor);
        self
    }

    /// Rank the matches of a query, without tying them to a job
    pub async fn rank(&self, query: &RankCheckQuery) -> Result<Vec<RankedMatch>> {
        let kind = self.selector.resolve(&query.search_url)?;
        query.validate()?;

        let extractor = self
            .extractors
            .get(&kind)
            .ok_or_else(|| RankCheckError::UnsupportedEngine(query.search_url.clone()))?;

        let candidates = extractor.extract_candidates(query).await?;
        if candidates.is_empty() {
            info!("No {} results for '{}'", kind, query.term_to_search);
            return Ok(Vec::new());
        }

        let limit = query.candidate_limit();
        let mut matches: Vec<RankedMatch> = candidates
            .iter()
            .take(limit)
            .enumerate()
            .filter(|(_, candidate)| should_record(candidate, &query.website_url))
            .filter_map(|(index, candidate)| {
                candidate.citation.clone().map(|url| RankedMatch {
                    // Rank counts every scanned candidate, matched or not
                    rank: (index + 1) as i32,
                    url,
                })
            })
            .collect();
        matches.sort_by_key(|m| m.rank);

        info!(
            "{} of {} {} candidates cite {}",
            matches.len(),
            candidates.len().min(limit),
            kind,
            query.website_url
        );
        Ok(matches)
    }

    /// Result entries for a persisted job, in ascending rank order
    pub async fn execute(&self, job: &Job) -> Result<Vec<NewResultEntry>> {
        let matches = self.rank(&job.query()).await?;
        Ok(matches
            .into_iter()
            .map(|ranked| NewResultEntry::from_match(job.id, ranked))
            .collect())
    }
}
