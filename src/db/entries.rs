//! Result entries database operations

use crate::db::DbPool;
use crate::error::Result;
use crate::models::{EntryId, JobId, NewResultEntry, ResultEntry};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct EntryRow {
    id: i32,
    job_id: i32,
    rank: i32,
    url: String,
    created_at: DateTime<Utc>,
}

impl From<EntryRow> for ResultEntry {
    fn from(row: EntryRow) -> Self {
        ResultEntry {
            id: row.id,
            job_id: row.job_id,
            rank: row.rank,
            url: row.url,
            created_at: row.created_at,
        }
    }
}

/// Insert entries in one transaction
pub async fn insert_entries(pool: &DbPool, entries: &[NewResultEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for entry in entries {
        sqlx::query("INSERT INTO result_entries (job_id, rank, url) VALUES ($1, $2, $3)")
            .bind(entry.job_id)
            .bind(entry.rank)
            .bind(&entry.url)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Entries of a job ordered by rank
pub async fn get_entries_by_job(pool: &DbPool, job_id: JobId) -> Result<Vec<ResultEntry>> {
    let rows = sqlx::query_as::<_, EntryRow>(
        "SELECT id, job_id, rank, url, created_at FROM result_entries WHERE job_id = $1 ORDER BY rank ASC",
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ResultEntry::from).collect())
}

/// All entries, oldest first
pub async fn list_entries(pool: &DbPool) -> Result<Vec<ResultEntry>> {
    let rows = sqlx::query_as::<_, EntryRow>(
        "SELECT id, job_id, rank, url, created_at FROM result_entries ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ResultEntry::from).collect())
}

/// Get an entry by ID
pub async fn get_entry_by_id(pool: &DbPool, id: EntryId) -> Result<Option<ResultEntry>> {
    let row = sqlx::query_as::<_, EntryRow>(
        "SELECT id, job_id, rank, url, created_at FROM result_entries WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(ResultEntry::from))
}
