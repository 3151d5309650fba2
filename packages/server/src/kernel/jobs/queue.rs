//! PostgreSQL-backed job queue implementation.
//!
//! The `JobQueue` trait is object safe so it can live behind
//! `Arc<dyn JobQueue>` in `ServerDeps`; typed commands go through the
//! `JobQueueExt::enqueue` helper, which serializes them first.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::job::{ErrorKind, Job};

/// Metadata for command serialization.
///
/// Commands implement this trait to provide the job type they run as.
pub trait CommandMeta {
    /// The command type name (used as job_type).
    fn command_type(&self) -> &'static str;

    /// Maximum retries for this command.
    fn max_retries(&self) -> i32 {
        3
    }
}

/// A serialized command ready to be stored.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: String,
    pub args: serde_json::Value,
    pub max_retries: i32,
    pub run_at: Option<DateTime<Utc>>,
}

impl NewJob {
    pub fn from_command<C>(command: &C) -> Result<Self>
    where
        C: Serialize + CommandMeta,
    {
        Ok(Self {
            job_type: command.command_type().to_string(),
            args: serde_json::to_value(command)?,
            max_retries: command.max_retries(),
            run_at: None,
        })
    }
}

/// Trait for job queue operations.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Store a job; returns its id.
    async fn push(&self, job: NewJob) -> Result<Uuid>;

    /// Claim up to `limit` jobs for processing.
    ///
    /// Uses `FOR UPDATE SKIP LOCKED` for concurrent-safe claiming.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<Job>>;

    /// Mark a job as successfully completed.
    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()>;

    /// Mark a job as failed with an error.
    ///
    /// If retries remain, the job is left `failed` and becomes claimable
    /// again after an exponential backoff. Otherwise, it is moved to dead
    /// letter.
    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<()>;
}

/// Typed enqueue helper available on every queue, including `dyn JobQueue`.
#[async_trait]
pub trait JobQueueExt {
    async fn enqueue<C>(&self, command: C) -> Result<Uuid>
    where
        C: Serialize + CommandMeta + Send + Sync;
}

#[async_trait]
impl<Q: JobQueue + ?Sized> JobQueueExt for Q {
    async fn enqueue<C>(&self, command: C) -> Result<Uuid>
    where
        C: Serialize + CommandMeta + Send + Sync,
    {
        self.push(NewJob::from_command(&command)?).await
    }
}

/// PostgreSQL-backed job queue implementation.
pub struct PostgresJobQueue {
    pool: PgPool,
    lease_secs: i64,
}

impl PostgresJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lease_secs: 300,
        }
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn push(&self, new_job: NewJob) -> Result<Uuid> {
        let job = Job::builder()
            .job_type(new_job.job_type)
            .args(new_job.args)
            .max_retries(new_job.max_retries)
            .run_at(new_job.run_at.unwrap_or_else(Utc::now))
            .build()
            .insert(&self.pool)
            .await?;

        debug!(job_id = %job.id, job_type = %job.job_type, "job enqueued");
        Ok(job.id)
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<Job>> {
        Job::claim(limit, worker_id, self.lease_secs, &self.pool).await
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'succeeded',
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<()> {
        let job = Job::find_by_id(job_id, &self.pool).await?;

        if job.can_retry(kind) {
            let delay_secs = job.backoff_secs();
            let retry_at = Utc::now() + chrono::Duration::seconds(delay_secs);

            sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'failed',
                    run_at = $1,
                    error_message = $2,
                    error_kind = $3,
                    lease_expires_at = NULL,
                    worker_id = NULL,
                    updated_at = NOW()
                WHERE id = $4
                "#,
            )
            .bind(retry_at)
            .bind(error)
            .bind(kind)
            .bind(job_id)
            .execute(&self.pool)
            .await?;

            debug!(job_id = %job_id, delay_secs, "job scheduled for retry");
        } else {
            // No retries left - dead letter
            sqlx::query(
                r#"
                UPDATE jobs
                SET status = 'dead_letter',
                    error_message = $1,
                    error_kind = $2,
                    lease_expires_at = NULL,
                    updated_at = NOW()
                WHERE id = $3
                "#,
            )
            .bind(error)
            .bind(kind)
            .bind(job_id)
            .execute(&self.pool)
            .await?;

            warn!(job_id = %job_id, job_type = %job.job_type, "job moved to dead letter");
        }

        Ok(())
    }
}
