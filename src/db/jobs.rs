//! Rank check jobs database operations

use crate::db::DbPool;
use crate::error::{RankCheckError, Result};
use crate::models::{Job, JobFields, JobId, RankCheckQuery};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row shape of `rank_check_jobs`; status is stored as text
#[derive(Debug, FromRow)]
struct JobRow {
    id: i32,
    search_url: String,
    term_to_search: String,
    website_url: String,
    maximum_records: i32,
    status: String,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = RankCheckError;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(Job {
            id: row.id,
            search_url: row.search_url,
            term_to_search: row.term_to_search,
            website_url: row.website_url,
            maximum_records: row.maximum_records,
            status: row.status.parse()?,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insert a job in `in_queue` state and return it
pub async fn insert_job(pool: &DbPool, query: &RankCheckQuery) -> Result<Job> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO rank_check_jobs (search_url, term_to_search, website_url, maximum_records, status)
        VALUES ($1, $2, $3, $4, 'in_queue')
        RETURNING *
        "#,
    )
    .bind(&query.search_url)
    .bind(&query.term_to_search)
    .bind(&query.website_url)
    .bind(query.maximum_records)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// Get a job by ID
pub async fn get_job_by_id(pool: &DbPool, id: JobId) -> Result<Option<Job>> {
    let row = sqlx::query_as::<_, JobRow>("SELECT * FROM rank_check_jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Job::try_from).transpose()
}

/// List all jobs, oldest first
pub async fn list_jobs(pool: &DbPool) -> Result<Vec<Job>> {
    let rows = sqlx::query_as::<_, JobRow>("SELECT * FROM rank_check_jobs ORDER BY id ASC")
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Job::try_from).collect()
}

/// Update only the provided columns, bumping updated_at
///
/// Returns the number of rows touched.
pub async fn update_job_fields(pool: &DbPool, id: JobId, fields: &JobFields) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE rank_check_jobs
        SET status = COALESCE($2, status),
            error_message = COALESCE($3, error_message),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(fields.status.map(|status| status.as_str()))
    .bind(fields.error_message.as_deref())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a job unless it is in progress, returning the removed row
///
/// Result entries go with it (ON DELETE CASCADE).
pub async fn delete_job_unless_running(pool: &DbPool, id: JobId) -> Result<Option<Job>> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        DELETE FROM rank_check_jobs
        WHERE id = $1
          AND status <> 'in_progress'
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}
