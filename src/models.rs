//! Rank check jobs and their result entries

use crate::error::{RankCheckError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Identity of a persisted rank check job
pub type JobId = i32;
pub type EntryId = i32;

// ============================================================================
// Job status
// ============================================================================

/// Lifecycle state of a rank check job
///
/// Progresses `InQueue -> InProgress -> {Completed | Error}` and never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    InQueue,
    InProgress,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::InQueue => "in_queue",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Whether moving from `self` to `next` is a forward step of the lifecycle
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::InQueue, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = RankCheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in_queue" => Ok(JobStatus::InQueue),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            other => Err(RankCheckError::InvalidStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// Parameters of a rank check, as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankCheckQuery {
    pub search_url: String,
    pub term_to_search: String,
    pub website_url: String,
    /// Caps how many candidates are scanned, not how many matches are kept
    pub maximum_records: i32,
}

impl RankCheckQuery {
    pub fn new(
        search_url: impl Into<String>,
        term_to_search: impl Into<String>,
        website_url: impl Into<String>,
        maximum_records: i32,
    ) -> Self {
        Self {
            search_url: search_url.into(),
            term_to_search: term_to_search.into(),
            website_url: website_url.into(),
            maximum_records,
        }
    }

    /// Reject blank or malformed parameters before anything is persisted or fetched
    pub fn validate(&self) -> Result<()> {
        self.parsed_search_url()?;

        if self.term_to_search.trim().is_empty() {
            return Err(RankCheckError::InvalidConfiguration(
                "term to search is required".to_string(),
            ));
        }
        if self.website_url.trim().is_empty() {
            return Err(RankCheckError::InvalidConfiguration(
                "website URL is required".to_string(),
            ));
        }
        if self.maximum_records < 1 {
            return Err(RankCheckError::InvalidConfiguration(format!(
                "maximum records must be at least 1 (got {})",
                self.maximum_records
            )));
        }

        Ok(())
    }

    /// The search URL as an absolute URL; scheme-less input gets `https://`
    pub fn parsed_search_url(&self) -> Result<Url> {
        let raw = self.search_url.trim();
        if raw.is_empty() {
            return Err(RankCheckError::InvalidConfiguration(
                "search URL is required".to_string(),
            ));
        }

        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };

        let url = Url::parse(&candidate).map_err(|e| {
            RankCheckError::InvalidConfiguration(format!("search URL '{}' is malformed: {}", raw, e))
        })?;
        if url.host_str().is_none() {
            return Err(RankCheckError::InvalidConfiguration(format!(
                "search URL '{}' has no host",
                raw
            )));
        }

        Ok(url)
    }

    /// `maximum_records` as a scan bound; only meaningful after `validate`
    pub fn candidate_limit(&self) -> usize {
        usize::try_from(self.maximum_records).unwrap_or(0)
    }
}

/// A persisted rank check job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub search_url: String,
    pub term_to_search: String,
    pub website_url: String,
    pub maximum_records: i32,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn query(&self) -> RankCheckQuery {
        RankCheckQuery {
            search_url: self.search_url.clone(),
            term_to_search: self.term_to_search.clone(),
            website_url: self.website_url.clone(),
            maximum_records: self.maximum_records,
        }
    }
}

/// Subset of job columns written by a partial update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFields {
    pub status: Option<JobStatus>,
    pub error_message: Option<String>,
}

impl JobFields {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.error_message.is_none()
    }
}

// ============================================================================
// Result entries
// ============================================================================

/// A match found by the engine, before it is tied to a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMatch {
    /// 1-based position among all scanned candidates
    pub rank: i32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResultEntry {
    pub job_id: JobId,
    pub rank: i32,
    pub url: String,
}

impl NewResultEntry {
    pub fn from_match(job_id: JobId, ranked: RankedMatch) -> Self {
        Self {
            job_id,
            rank: ranked.rank,
            url: ranked.url,
        }
    }
}

/// A persisted match; never mutated after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub id: EntryId,
    pub job_id: JobId,
    pub rank: i32,
    pub url: String,
    pub created_at: DateTime<Utc>,
}
