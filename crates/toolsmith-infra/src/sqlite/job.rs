//! SQLite job repository implementation.
//!
//! Implements `JobRepository` from `toolsmith-core` using sqlx with split
//! read/write pools. The full job record is stored as a JSON document; the
//! indexed columns (`user_id`, `status`, `current_step`, timestamps) serve
//! the list and status queries without JSON parsing.
//!
//! `put` is an upsert (last-writer-wins per job id), which is sufficient
//! because the orchestrator is the single writer per job.

use sqlx::Row;
use toolsmith_core::repository::JobRepository;
use toolsmith_types::error::RepositoryError;
use toolsmith_types::job::{ConstructionJob, JobStatus};
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `JobRepository`.
pub struct SqliteJobRepository {
    pool: DatabasePool,
}

impl SqliteJobRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct JobRow {
    record: String,
}

impl JobRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            record: row.try_get("record")?,
        })
    }

    fn into_job(self) -> Result<ConstructionJob, RepositoryError> {
        serde_json::from_str(&self.record)
            .map_err(|e| RepositoryError::Query(format!("invalid job record JSON: {e}")))
    }
}

fn status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::InProgress => "in_progress",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}

impl JobRepository for SqliteJobRepository {
    async fn put(&self, job: &ConstructionJob) -> Result<(), RepositoryError> {
        let record = serde_json::to_string(job)
            .map_err(|e| RepositoryError::Query(format!("serialize job record: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO construction_jobs
                (id, user_id, status, current_step, error, record, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                current_step = excluded.current_step,
                error = excluded.error,
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(job.id.to_string())
        .bind(&job.user_id)
        .bind(status_to_str(job.status))
        .bind(job.current_step.as_str())
        .bind(&job.error)
        .bind(record)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<ConstructionJob>, RepositoryError> {
        let row = sqlx::query("SELECT record FROM construction_jobs WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            JobRow::from_row(&row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_job()
        })
        .transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ConstructionJob>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT record FROM construction_jobs WHERE user_id = ?1 ORDER BY updated_at DESC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                JobRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_job()
            })
            .collect()
    }

    async fn list_unfinished(&self) -> Result<Vec<ConstructionJob>, RepositoryError> {
        let rows =
            sqlx::query("SELECT record FROM construction_jobs WHERE status = 'in_progress'")
                .fetch_all(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                JobRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_job()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
