//! Rank Checker - A Rust service that finds where a website ranks in search results
//!
//! A rank check takes a search engine URL, a search term, a target website and
//! a cap on how many results to scan. The service pages through the engine's
//! results, keeps the entries whose citation mentions the target website, and
//! records each match with its 1-based position among all scanned results.
//!
//! Jobs are persisted, queued, and executed one at a time by a background
//! worker:
//! - `InQueue` when submitted
//! - `InProgress` while the worker runs the check
//! - `Completed` or `Error` once it finishes

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod worker;

pub use config::{AppConfig, FetcherConfig};
pub use engine::{EngineSelector, ExtractorKind, HttpFetcher, RankCheckEngine};
pub use error::{RankCheckError, Result};
pub use models::{Job, JobStatus, RankCheckQuery, RankedMatch, ResultEntry};
pub use service::RankCheckService;

use std::sync::Arc;

/// Run a single rank check without persisting anything
///
/// # Example
/// ```ignore
/// use rank_checker::{check_rank, RankCheckQuery};
///
/// #[tokio::main]
/// async fn main() -> rank_checker::Result<()> {
///     let query = RankCheckQuery::new("https://www.bing.com/search", "widgets", "example.com", 30);
///     for ranked in check_rank(&query).await? {
///         println!("#{} {}", ranked.rank, ranked.url);
///     }
///     Ok(())
/// }
/// ```
pub async fn check_rank(query: &RankCheckQuery) -> Result<Vec<RankedMatch>> {
    check_rank_with_config(query, &FetcherConfig::default()).await
}

/// Run a single rank check with a custom fetcher configuration
pub async fn check_rank_with_config(
    query: &RankCheckQuery,
    fetcher: &FetcherConfig,
) -> Result<Vec<RankedMatch>> {
    let engine = RankCheckEngine::scraping(Arc::new(HttpFetcher::with_config(fetcher)?));
    engine.rank(query).await
}
