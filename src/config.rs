//! Environment-driven configuration

use crate::error::{RankCheckError, Result};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for the results page fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Connection timeout (default: 10 seconds)
    pub connect_timeout: Duration,
    /// Request timeout (default: 30 seconds)
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub job_timeout: Duration,
    pub fetcher: FetcherConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            job_timeout: Duration::from_secs(300), // 5 minutes
            fetcher: FetcherConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secs = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| {
                        RankCheckError::ConfigError(format!("{} must be a whole number of seconds, got '{}'", key, raw))
                    }),
                None => Ok(default),
            }
        };

        let max_connections = match lookup("RANK_CHECKER_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                RankCheckError::ConfigError(format!(
                    "RANK_CHECKER_MAX_CONNECTIONS must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            None => defaults.max_connections,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections,
            job_timeout: secs("RANK_CHECKER_JOB_TIMEOUT_SECS", defaults.job_timeout)?,
            fetcher: FetcherConfig {
                connect_timeout: secs(
                    "RANK_CHECKER_CONNECT_TIMEOUT_SECS",
                    defaults.fetcher.connect_timeout,
                )?,
                request_timeout: secs(
                    "RANK_CHECKER_REQUEST_TIMEOUT_SECS",
                    defaults.fetcher.request_timeout,
                )?,
                user_agent: lookup("RANK_CHECKER_USER_AGENT").unwrap_or(defaults.fetcher.user_agent),
            },
        })
    }

    /// The database URL, or a configuration error when unset
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| RankCheckError::ConfigError("DATABASE_URL not set".to_string()))
    }
}
