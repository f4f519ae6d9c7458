//! Worker configuration

use std::time::Duration;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Deadline for one rank check (extraction and ranking)
    pub job_timeout: Duration,

    /// Re-enqueue jobs left `InQueue` in the store when the worker starts
    pub requeue_on_start: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(300), // 5 minutes
            requeue_on_start: true,
        }
    }
}

impl WorkerConfig {
    /// Create a new config builder
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::default()
    }
}

/// Builder for WorkerConfig
#[derive(Default)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Set job timeout
    pub fn job_timeout(mut self, duration: Duration) -> Self {
        self.config.job_timeout = duration;
        self
    }

    /// Set job timeout in seconds
    pub fn job_timeout_secs(mut self, secs: u64) -> Self {
        self.config.job_timeout = Duration::from_secs(secs);
        self
    }

    pub fn requeue_on_start(mut self, enable: bool) -> Self {
        self.config.requeue_on_start = enable;
        self
    }

    /// Build the config
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = WorkerConfig::builder()
            .job_timeout_secs(45)
            .requeue_on_start(false)
            .build();
        assert_eq!(config.job_timeout, Duration::from_secs(45));
        assert!(!config.requeue_on_start);

        let defaults = WorkerConfig::default();
        assert_eq!(defaults.job_timeout, Duration::from_secs(300));
        assert!(defaults.requeue_on_start);
    }
}
