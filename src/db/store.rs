//! PostgreSQL implementation of the store traits

use crate::config::AppConfig;
use crate::db::{create_pool, entries, jobs, DbPool};
use crate::error::{RankCheckError, Result};
use crate::models::{
    EntryId, Job, JobFields, JobId, NewResultEntry, RankCheckQuery, ResultEntry,
};
use crate::store::{JobDeletion, JobStore, StoreProvider};
use async_trait::async_trait;

/// `JobStore` over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_job(&self, id: JobId) -> Result<Option<Job>> {
        jobs::get_job_by_id(&self.pool, id).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        jobs::list_jobs(&self.pool).await
    }

    async fn insert_job(&self, query: &RankCheckQuery) -> Result<Job> {
        jobs::insert_job(&self.pool, query).await
    }

    async fn update_job_fields(&self, id: JobId, fields: &JobFields) -> Result<()> {
        if jobs::update_job_fields(&self.pool, id, fields).await? == 0 {
            return Err(RankCheckError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_job_unless_running(&self, id: JobId) -> Result<JobDeletion> {
        if let Some(job) = jobs::delete_job_unless_running(&self.pool, id).await? {
            return Ok(JobDeletion::Deleted(job));
        }

        // Nothing removed: either the job is absent or it was running
        match jobs::get_job_by_id(&self.pool, id).await? {
            Some(_) => Ok(JobDeletion::Running),
            None => Ok(JobDeletion::Missing),
        }
    }

    async fn insert_entries(&self, new_entries: &[NewResultEntry]) -> Result<()> {
        entries::insert_entries(&self.pool, new_entries).await
    }

    async fn list_entries_for_job(&self, job_id: JobId) -> Result<Vec<ResultEntry>> {
        entries::get_entries_by_job(&self.pool, job_id).await
    }

    async fn list_entries(&self) -> Result<Vec<ResultEntry>> {
        entries::list_entries(&self.pool).await
    }

    async fn find_entry(&self, id: EntryId) -> Result<Option<ResultEntry>> {
        entries::get_entry_by_id(&self.pool, id).await
    }
}

/// Opens store handles for background work on a pool of its own
///
/// The pool is separate from the one serving submissions, so deferred jobs
/// never borrow a submitter's connections.
#[derive(Debug, Clone)]
pub struct PgStoreProvider {
    pool: DbPool,
}

impl PgStoreProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connect a dedicated worker pool using the configured database URL
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let pool = create_pool(config.require_database_url()?, config.max_connections).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl StoreProvider for PgStoreProvider {
    async fn open(&self) -> Result<Box<dyn JobStore>> {
        Ok(Box::new(PgJobStore::new(self.pool.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool_from_config, run_migrations};
    use crate::models::JobStatus;

    #[tokio::test]
    #[ignore] // Requires database
    async fn job_lifecycle_round_trip() {
        dotenvy::dotenv().ok();
        let config = AppConfig::from_env().unwrap();
        let pool = create_pool_from_config(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = PgJobStore::new(pool);

        let job = store
            .insert_job(&RankCheckQuery::new(
                "https://www.bing.com/search",
                "widgets",
                "example.com",
                10,
            ))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::InQueue);

        store
            .update_job_fields(job.id, &JobFields::status(JobStatus::InProgress))
            .await
            .unwrap();
        store
            .insert_entries(&[NewResultEntry {
                job_id: job.id,
                rank: 4,
                url: "example.com/page".to_string(),
            }])
            .await
            .unwrap();

        let entries = store.list_entries_for_job(job.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rank, 4);

        assert_eq!(
            store.delete_job_unless_running(job.id).await.unwrap(),
            JobDeletion::Running
        );
        store
            .update_job_fields(job.id, &JobFields::status(JobStatus::Completed))
            .await
            .unwrap();
        assert!(matches!(
            store.delete_job_unless_running(job.id).await.unwrap(),
            JobDeletion::Deleted(_)
        ));
        assert!(store.list_entries_for_job(job.id).await.unwrap().is_empty());
        assert_eq!(
            store.delete_job_unless_running(job.id).await.unwrap(),
            JobDeletion::Missing
        );
    }
}
