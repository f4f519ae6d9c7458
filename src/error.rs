//! Error types for rank-checker

use crate::models::{EntryId, JobId};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankCheckError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported search engine: {0}")]
    UnsupportedEngine(String),

    #[error("Failed to fetch URL: {url}")]
    FetchError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for URL: {url}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Failed to parse results page: {0}")]
    ParseError(String),

    #[error("Queue wait cancelled")]
    Cancelled,

    #[error("Job queue is closed")]
    QueueClosed,

    #[error("Rank check job {0} not found")]
    NotFound(JobId),

    #[error("Result entry {0} not found")]
    EntryNotFound(EntryId),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rank check timed out after {0:?}")]
    JobTimeout(Duration),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Unknown job status: {0}")]
    InvalidStatus(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RankCheckError {
    /// Network or parse failure while reading a results page
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            RankCheckError::FetchError { .. }
                | RankCheckError::HttpStatusError { .. }
                | RankCheckError::ParseError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RankCheckError>;

#[cfg(test)]
mod tests {
    use super::RankCheckError;

    #[test]
    fn extraction_failures_are_grouped() {
        assert!(RankCheckError::ParseError("bad".into()).is_extraction_failure());
        assert!(RankCheckError::HttpStatusError {
            url: "https://www.bing.com/search".into(),
            status: 503,
        }
        .is_extraction_failure());
        assert!(!RankCheckError::UnsupportedEngine("x".into()).is_extraction_failure());
        assert!(!RankCheckError::Cancelled.is_extraction_failure());
    }

    #[test]
    fn unsupported_engine_message_names_the_url() {
        let err = RankCheckError::UnsupportedEngine("https://unknown.example/search".into());
        assert_eq!(
            err.to_string(),
            "Unsupported search engine: https://unknown.example/search"
        );
    }

    #[test]
    fn missing_jobs_and_entries_are_told_apart() {
        assert_eq!(
            RankCheckError::NotFound(7).to_string(),
            "Rank check job 7 not found"
        );
        assert_eq!(
            RankCheckError::EntryNotFound(7).to_string(),
            "Result entry 7 not found"
        );
    }
}
