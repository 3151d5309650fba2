//! Job model for background command execution.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    /// Failed an attempt; retried once `run_at` passes
    Failed,
    DeadLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "error_kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient error - will retry if attempts remain
    #[default]
    Retryable,
    /// Permanent error - will not retry
    NonRetryable,
}

impl ErrorKind {
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorKind::Retryable)
    }
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,
    pub job_type: String,
    #[builder(default = serde_json::json!({}))]
    pub args: serde_json::Value,
    #[builder(default)]
    pub status: JobStatus,
    /// Executions started so far.
    #[builder(default = 0)]
    pub attempt: i32,
    #[builder(default = 3)]
    pub max_retries: i32,
    #[builder(default = Utc::now())]
    pub run_at: DateTime<Utc>,
    #[builder(default)]
    pub lease_expires_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub worker_id: Option<String>,
    #[builder(default)]
    pub error_message: Option<String>,
    #[builder(default)]
    pub error_kind: Option<ErrorKind>,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether another attempt is allowed after a failure of this kind.
    pub fn can_retry(&self, kind: ErrorKind) -> bool {
        kind.should_retry() && self.attempt <= self.max_retries
    }

    /// Exponential backoff in seconds, capped at one hour.
    pub fn backoff_secs(&self) -> i64 {
        2i64.saturating_pow(self.attempt.max(0) as u32).min(3600)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (id, job_type, args, status, attempt, max_retries, run_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.job_type)
        .bind(&self.args)
        .bind(self.status)
        .bind(self.attempt)
        .bind(self.max_retries)
        .bind(self.run_at)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(job)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;

        Ok(job)
    }

    pub async fn find_by_type(job_type: &str, pool: &PgPool) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE job_type = $1 ORDER BY created_at",
        )
        .bind(job_type)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }

    /// Claim ready jobs, including running jobs whose lease has lapsed.
    pub async fn claim(
        limit: i64,
        worker_id: &str,
        lease_secs: i64,
        pool: &PgPool,
    ) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = 'running',
                attempt = attempt + 1,
                worker_id = $2,
                lease_expires_at = NOW() + make_interval(secs => $3),
                updated_at = NOW()
            WHERE id IN (
                SELECT id FROM jobs
                WHERE (status IN ('pending', 'failed') AND run_at <= NOW())
                   OR (status = 'running' AND lease_expires_at < NOW())
                ORDER BY run_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(worker_id)
        .bind(lease_secs as f64)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }
}
