//! Rank check service
//!
//! The owned entry point for submitting, inspecting and deleting jobs.
//! Construct one at startup and share it by reference.

use crate::engine::RankCheckEngine;
use crate::error::{RankCheckError, Result};
use crate::models::{EntryId, Job, JobId, JobStatus, RankCheckQuery, ResultEntry};
use crate::store::{JobDeletion, JobStore, StoreProvider};
use crate::worker::{JobLifecycle, JobQueue, JobWorker, WorkerConfig};
use std::sync::Arc;
use tracing::{info, warn};

pub struct RankCheckService {
    store: Arc<dyn JobStore>,
    queue: Arc<JobQueue>,
    lifecycle: Arc<JobLifecycle>,
}

impl RankCheckService {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<JobQueue>, lifecycle: Arc<JobLifecycle>) -> Self {
        Self {
            store,
            queue,
            lifecycle,
        }
    }

    /// Build a service and the worker that drains its queue
    ///
    /// `store` serves submissions; `stores` opens the handles deferred jobs use.
    pub fn bootstrap(
        store: Arc<dyn JobStore>,
        stores: Arc<dyn StoreProvider>,
        engine: Arc<RankCheckEngine>,
        config: &WorkerConfig,
    ) -> (Self, JobWorker) {
        let queue = Arc::new(JobQueue::new());
        let lifecycle = Arc::new(JobLifecycle::new(stores, engine, config.job_timeout));
        let worker = JobWorker::new(queue.clone());
        (Self::new(store, queue, lifecycle), worker)
    }

    /// Persist a job as `InQueue` and schedule it; returns without waiting
    pub async fn submit(&self, query: RankCheckQuery) -> Result<Job> {
        query.validate()?;

        let job = self.store.insert_job(&query).await?;
        self.queue.enqueue(self.lifecycle.work_item(job.id))?;

        info!(
            "Queued job {} ('{}' for {}), {} pending",
            job.id,
            job.term_to_search,
            job.website_url,
            self.queue.pending()
        );
        Ok(job)
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job> {
        self.store
            .find_job(id)
            .await?
            .ok_or(RankCheckError::NotFound(id))
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.store.list_jobs().await
    }

    /// Entries of an existing job, in rank order
    pub async fn list_entries(&self, job_id: JobId) -> Result<Vec<ResultEntry>> {
        self.get_job(job_id).await?;
        self.store.list_entries_for_job(job_id).await
    }

    /// Every stored entry across all jobs
    pub async fn list_all_entries(&self) -> Result<Vec<ResultEntry>> {
        self.store.list_entries().await
    }

    pub async fn get_entry(&self, id: EntryId) -> Result<ResultEntry> {
        self.store
            .find_entry(id)
            .await?
            .ok_or(RankCheckError::EntryNotFound(id))
    }

    /// Delete a job and its entries, returning the job as it was
    ///
    /// Refused with `Conflict` while the job is running.
    pub async fn delete_job(&self, id: JobId) -> Result<Job> {
        match self.store.delete_job_unless_running(id).await? {
            JobDeletion::Deleted(job) => {
                info!("Deleted job {} ({})", id, job.status);
                Ok(job)
            }
            JobDeletion::Running => Err(RankCheckError::Conflict(format!(
                "job {} is in progress and cannot be deleted",
                id
            ))),
            JobDeletion::Missing => Err(RankCheckError::NotFound(id)),
        }
    }

    /// Enqueue every stored job still waiting in `InQueue`
    pub async fn requeue_pending(&self) -> Result<usize> {
        let mut requeued = 0;
        for job in self.store.list_jobs().await? {
            if job.status != JobStatus::InQueue {
                continue;
            }
            self.queue.enqueue(self.lifecycle.work_item(job.id))?;
            requeued += 1;
        }

        if requeued > 0 {
            warn!("Re-enqueued {} job(s) left in queue by a previous run", requeued);
        }
        Ok(requeued)
    }

    /// Work items waiting for the worker
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }
}
