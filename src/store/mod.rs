//! Persistence boundary for jobs and result entries
//!
//! `JobStore` is the data-store contract; `StoreProvider` opens a fresh store
//! handle for work that runs after the submitting request has returned.

pub mod memory;

pub use memory::{MemoryJobStore, MemoryStoreProvider};

use crate::error::Result;
use crate::models::{EntryId, Job, JobFields, JobId, NewResultEntry, RankCheckQuery, ResultEntry};
use async_trait::async_trait;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_job(&self, id: JobId) -> Result<Option<Job>>;

    async fn list_jobs(&self) -> Result<Vec<Job>>;

    /// Persist a new job in `InQueue` state; timestamps are set here
    async fn insert_job(&self, query: &RankCheckQuery) -> Result<Job>;

    /// Write only the given fields; fails with `NotFound` when the job is absent
    async fn update_job_fields(&self, id: JobId, fields: &JobFields) -> Result<()>;

    /// Delete a job and its entries unless it is `InProgress`
    ///
    /// The status check and the removal happen as one step, so a worker
    /// claiming the job cannot slip in between.
    async fn delete_job_unless_running(&self, id: JobId) -> Result<JobDeletion>;

    async fn insert_entries(&self, entries: &[NewResultEntry]) -> Result<()>;

    /// Entries of a job, ordered by rank
    async fn list_entries_for_job(&self, job_id: JobId) -> Result<Vec<ResultEntry>>;

    /// Every entry of every job, ordered by id
    async fn list_entries(&self) -> Result<Vec<ResultEntry>>;

    async fn find_entry(&self, id: EntryId) -> Result<Option<ResultEntry>>;
}

/// Outcome of [`JobStore::delete_job_unless_running`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobDeletion {
    /// The job as it was when removed
    Deleted(Job),
    Running,
    Missing,
}

#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// A store handle owned by the caller and not shared with other executions
    async fn open(&self) -> Result<Box<dyn JobStore>>;
}
