//! In-memory store, used by tests and store-less runs

use crate::error::{RankCheckError, Result};
use crate::models::{
    EntryId, Job, JobFields, JobId, JobStatus, NewResultEntry, RankCheckQuery, ResultEntry,
};
use crate::store::{JobDeletion, JobStore, StoreProvider};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    jobs: BTreeMap<JobId, Job>,
    entries: Vec<ResultEntry>,
    next_job_id: JobId,
    next_entry_id: i32,
}

/// A `JobStore` over shared in-process maps
///
/// Clones see the same data, the way two connections see the same database.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_job(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.state().jobs.get(&id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.state().jobs.values().cloned().collect())
    }

    async fn insert_job(&self, query: &RankCheckQuery) -> Result<Job> {
        let mut state = self.state();
        state.next_job_id += 1;
        let now = Utc::now();
        let job = Job {
            id: state.next_job_id,
            search_url: query.search_url.clone(),
            term_to_search: query.term_to_search.clone(),
            website_url: query.website_url.clone(),
            maximum_records: query.maximum_records,
            status: JobStatus::InQueue,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update_job_fields(&self, id: JobId, fields: &JobFields) -> Result<()> {
        let mut state = self.state();
        let job = state.jobs.get_mut(&id).ok_or(RankCheckError::NotFound(id))?;
        if let Some(status) = fields.status {
            job.status = status;
        }
        if let Some(message) = &fields.error_message {
            job.error_message = Some(message.clone());
        }
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_job_unless_running(&self, id: JobId) -> Result<JobDeletion> {
        let mut state = self.state();
        match state.jobs.get(&id) {
            None => return Ok(JobDeletion::Missing),
            Some(job) if job.status == JobStatus::InProgress => return Ok(JobDeletion::Running),
            Some(_) => {}
        }

        let job = state.jobs.remove(&id).ok_or(RankCheckError::NotFound(id))?;
        state.entries.retain(|entry| entry.job_id != id);
        Ok(JobDeletion::Deleted(job))
    }

    async fn insert_entries(&self, entries: &[NewResultEntry]) -> Result<()> {
        let mut state = self.state();
        if let Some(orphan) = entries.iter().find(|e| !state.jobs.contains_key(&e.job_id)) {
            return Err(RankCheckError::StoreError(format!(
                "result entry references missing job {}",
                orphan.job_id
            )));
        }

        let now = Utc::now();
        for entry in entries {
            state.next_entry_id += 1;
            let id = state.next_entry_id;
            state.entries.push(ResultEntry {
                id,
                job_id: entry.job_id,
                rank: entry.rank,
                url: entry.url.clone(),
                created_at: now,
            });
        }
        Ok(())
    }

    async fn list_entries_for_job(&self, job_id: JobId) -> Result<Vec<ResultEntry>> {
        let mut entries: Vec<ResultEntry> = self
            .state()
            .entries
            .iter()
            .filter(|entry| entry.job_id == job_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.rank);
        Ok(entries)
    }

    async fn list_entries(&self) -> Result<Vec<ResultEntry>> {
        let mut entries = self.state().entries.clone();
        entries.sort_by_key(|entry| entry.id);
        Ok(entries)
    }

    async fn find_entry(&self, id: EntryId) -> Result<Option<ResultEntry>> {
        Ok(self.state().entries.iter().find(|entry| entry.id == id).cloned())
    }
}

/// Hands out handles onto one `MemoryJobStore`
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreProvider {
    store: MemoryJobStore,
}

impl MemoryStoreProvider {
    pub fn new(store: MemoryJobStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StoreProvider for MemoryStoreProvider {
    async fn open(&self) -> Result<Box<dyn JobStore>> {
        Ok(Box::new(self.store.clone()))
    }
}
