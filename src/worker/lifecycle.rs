//! Job lifecycle coordination
//!
//! Maps one rank check execution onto status writes:
//! `InQueue -> InProgress -> Completed | Error`.

use crate::engine::RankCheckEngine;
use crate::error::{RankCheckError, Result};
use crate::models::{Job, JobFields, JobId, JobStatus};
use crate::store::{JobStore, StoreProvider};
use crate::worker::WorkItem;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Runs a queued job against a freshly opened store handle
pub struct JobLifecycle {
    stores: Arc<dyn StoreProvider>,
    engine: Arc<RankCheckEngine>,
    job_timeout: Duration,
}

impl JobLifecycle {
    pub fn new(
        stores: Arc<dyn StoreProvider>,
        engine: Arc<RankCheckEngine>,
        job_timeout: Duration,
    ) -> Self {
        Self {
            stores,
            engine,
            job_timeout,
        }
    }

    /// The deferred work for a job; captures only the job id and shared services
    pub fn work_item(self: &Arc<Self>, job_id: JobId) -> WorkItem {
        let lifecycle = Arc::clone(self);
        WorkItem::new(format!("rank check job {}", job_id), move || {
            async move { lifecycle.run(job_id).await.map(|_| ()) }.boxed()
        })
    }

    /// Execute a job and record its outcome
    ///
    /// Returns the status the job was left in. Errors are returned only when
    /// the store itself fails; the job may then remain `InProgress`.
    pub async fn run(&self, job_id: JobId) -> Result<JobStatus> {
        let store = self.stores.open().await?;

        let job = store
            .find_job(job_id)
            .await?
            .ok_or(RankCheckError::NotFound(job_id))?;

        if !job.status.can_transition_to(JobStatus::InProgress) {
            warn!(
                "Skipping job {}: status is {}, expected {}",
                job_id,
                job.status,
                JobStatus::InQueue
            );
            return Ok(job.status);
        }

        store
            .update_job_fields(job_id, &JobFields::status(JobStatus::InProgress))
            .await?;
        info!(
            "Job {} in progress: '{}' for {} on {}",
            job_id, job.term_to_search, job.website_url, job.search_url
        );

        match self.execute_and_record(store.as_ref(), &job).await {
            Ok(recorded) => {
                info!("Job {} completed with {} entries", job_id, recorded);
                Ok(JobStatus::Completed)
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                // Entries already written stay; the job is marked failed
                store
                    .update_job_fields(job_id, &JobFields::failed(e.to_string()))
                    .await?;
                Ok(JobStatus::Error)
            }
        }
    }

    /// Run the engine under the deadline, then persist entries and completion
    ///
    /// The two writes are not atomic.
    async fn execute_and_record(&self, store: &dyn JobStore, job: &Job) -> Result<usize> {
        let entries = tokio::time::timeout(self.job_timeout, self.engine.execute(job))
            .await
            .map_err(|_| RankCheckError::JobTimeout(self.job_timeout))??;

        store.insert_entries(&entries).await?;
        store
            .update_job_fields(job.id, &JobFields::status(JobStatus::Completed))
            .await?;

        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineSelector, ExtractorKind, RawCandidate, SearchResultExtractor};
    use crate::models::{EntryId, NewResultEntry, RankCheckQuery, ResultEntry};
    use crate::store::{JobDeletion, MemoryJobStore, MemoryStoreProvider};
    use async_trait::async_trait;

    struct CannedExtractor(Vec<&'static str>);

    #[async_trait]
    impl SearchResultExtractor for CannedExtractor {
        async fn extract_candidates(&self, _query: &RankCheckQuery) -> Result<Vec<RawCandidate>> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, c)| RawCandidate::new(i, Some(c.to_string())))
                .collect())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl SearchResultExtractor for FailingExtractor {
        async fn extract_candidates(&self, _query: &RankCheckQuery) -> Result<Vec<RawCandidate>> {
            Err(RankCheckError::ParseError("unexpected markup".to_string()))
        }
    }

    struct StallingExtractor;

    #[async_trait]
    impl SearchResultExtractor for StallingExtractor {
        async fn extract_candidates(&self, _query: &RankCheckQuery) -> Result<Vec<RawCandidate>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    /// Delegates to a memory store but refuses to mark jobs completed
    #[derive(Clone)]
    struct CompletionRejectingStore {
        inner: MemoryJobStore,
    }

    #[async_trait]
    impl JobStore for CompletionRejectingStore {
        async fn find_job(&self, id: JobId) -> Result<Option<Job>> {
            self.inner.find_job(id).await
        }
        async fn list_jobs(&self) -> Result<Vec<Job>> {
            self.inner.list_jobs().await
        }
        async fn insert_job(&self, query: &RankCheckQuery) -> Result<Job> {
            self.inner.insert_job(query).await
        }
        async fn update_job_fields(&self, id: JobId, fields: &JobFields) -> Result<()> {
            if fields.status == Some(JobStatus::Completed) {
                return Err(RankCheckError::StoreError("write rejected".to_string()));
            }
            self.inner.update_job_fields(id, fields).await
        }
        async fn delete_job_unless_running(&self, id: JobId) -> Result<JobDeletion> {
            self.inner.delete_job_unless_running(id).await
        }
        async fn insert_entries(&self, entries: &[NewResultEntry]) -> Result<()> {
            self.inner.insert_entries(entries).await
        }
        async fn list_entries_for_job(&self, job_id: JobId) -> Result<Vec<ResultEntry>> {
            self.inner.list_entries_for_job(job_id).await
        }
        async fn list_entries(&self) -> Result<Vec<ResultEntry>> {
            self.inner.list_entries().await
        }
        async fn find_entry(&self, id: EntryId) -> Result<Option<ResultEntry>> {
            self.inner.find_entry(id).await
        }
    }

    #[async_trait]
    impl StoreProvider for CompletionRejectingStore {
        async fn open(&self) -> Result<Box<dyn JobStore>> {
            Ok(Box::new(self.clone()))
        }
    }

    fn engine_with(kind: ExtractorKind, extractor: Arc<dyn SearchResultExtractor>) -> Arc<RankCheckEngine> {
        Arc::new(RankCheckEngine::new(EngineSelector::default()).with_extractor(kind, extractor))
    }

    async fn queued_job(store: &MemoryJobStore, search_url: &str) -> Job {
        store
            .insert_job(&RankCheckQuery::new(search_url, "widgets", "example.com", 20))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn successful_run_persists_entries_then_completes() {
        let store = MemoryJobStore::new();
        let job = queued_job(&store, "https://www.google.com/search").await;
        let lifecycle = JobLifecycle::new(
            Arc::new(MemoryStoreProvider::new(store.clone())),
            engine_with(
                ExtractorKind::Google,
                Arc::new(CannedExtractor(vec!["a.test", "example.com/1", "b.test", "example.com/2"])),
            ),
            Duration::from_secs(5),
        );

        assert_eq!(lifecycle.run(job.id).await.unwrap(), JobStatus::Completed);

        let stored = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.error_message, None);
        let ranks: Vec<i32> = store
            .list_entries_for_job(job.id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.rank)
            .collect();
        assert_eq!(ranks, vec![2, 4]);
    }

    #[tokio::test]
    async fn extraction_failure_is_recorded_as_error() {
        let store = MemoryJobStore::new();
        let job = queued_job(&store, "https://www.bing.com/search").await;
        let lifecycle = JobLifecycle::new(
            Arc::new(MemoryStoreProvider::new(store.clone())),
            engine_with(ExtractorKind::Bing, Arc::new(FailingExtractor)),
            Duration::from_secs(5),
        );

        assert_eq!(lifecycle.run(job.id).await.unwrap(), JobStatus::Error);

        let stored = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Error);
        assert_eq!(
            stored.error_message.as_deref(),
            Some("Failed to parse results page: unexpected markup")
        );
    }

    #[tokio::test]
    async fn deadline_turns_a_stalled_check_into_an_error() {
        let store = MemoryJobStore::new();
        let job = queued_job(&store, "https://search.yahoo.com/search").await;
        let lifecycle = JobLifecycle::new(
            Arc::new(MemoryStoreProvider::new(store.clone())),
            engine_with(ExtractorKind::Yahoo, Arc::new(StallingExtractor)),
            Duration::from_millis(20),
        );

        assert_eq!(lifecycle.run(job.id).await.unwrap(), JobStatus::Error);
        let stored = store.find_job(job.id).await.unwrap().unwrap();
        assert!(stored.error_message.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn jobs_past_the_queue_are_not_rerun() {
        let store = MemoryJobStore::new();
        let job = queued_job(&store, "https://www.google.com/search").await;
        store
            .update_job_fields(job.id, &JobFields::status(JobStatus::Completed))
            .await
            .unwrap();
        let lifecycle = JobLifecycle::new(
            Arc::new(MemoryStoreProvider::new(store.clone())),
            engine_with(ExtractorKind::Google, Arc::new(FailingExtractor)),
            Duration::from_secs(5),
        );

        assert_eq!(lifecycle.run(job.id).await.unwrap(), JobStatus::Completed);
        assert_eq!(
            store.find_job(job.id).await.unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let lifecycle = JobLifecycle::new(
            Arc::new(MemoryStoreProvider::default()),
            engine_with(ExtractorKind::Google, Arc::new(FailingExtractor)),
            Duration::from_secs(5),
        );
        assert!(matches!(
            lifecycle.run(404).await,
            Err(RankCheckError::NotFound(404))
        ));
    }

    #[tokio::test]
    async fn failed_completion_write_marks_job_error_with_entries_kept() {
        let inner = MemoryJobStore::new();
        let job = queued_job(&inner, "https://www.google.com/search").await;
        let lifecycle = JobLifecycle::new(
            Arc::new(CompletionRejectingStore {
                inner: inner.clone(),
            }),
            engine_with(ExtractorKind::Google, Arc::new(CannedExtractor(vec!["example.com"]))),
            Duration::from_secs(5),
        );

        assert_eq!(lifecycle.run(job.id).await.unwrap(), JobStatus::Error);

        let stored = inner.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Error);
        assert_eq!(stored.error_message.as_deref(), Some("Store error: write rejected"));
        assert_eq!(inner.list_entries_for_job(job.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn work_item_runs_the_job() {
        let store = MemoryJobStore::new();
        let job = queued_job(&store, "https://www.google.com/search").await;
        let lifecycle = Arc::new(JobLifecycle::new(
            Arc::new(MemoryStoreProvider::new(store.clone())),
            engine_with(ExtractorKind::Google, Arc::new(CannedExtractor(vec![]))),
            Duration::from_secs(5),
        ));

        let item = lifecycle.work_item(job.id);
        assert_eq!(item.label(), format!("rank check job {}", job.id));
        item.into_future().await.unwrap();

        assert_eq!(
            store.find_job(job.id).await.unwrap().unwrap().status,
            JobStatus::Completed
        );
    }
}
