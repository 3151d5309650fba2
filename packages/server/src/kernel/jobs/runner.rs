//! Job runner service for processing background jobs.
//!
//! ```text
//! JobRunner
//!     │
//!     ├─► Poll DB (claim jobs via JobQueue)
//!     ├─► Execute via JobRegistry (deserialize + call handler)
//!     └─► Mark succeeded/failed (JobQueue handles retries)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::job::{ErrorKind, Job};
use super::queue::JobQueue;
use super::registry::SharedJobRegistry;
use crate::kernel::ServerDeps;

/// Configuration for the job runner.
#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// Maximum number of jobs to claim at once
    pub batch_size: i64,
    /// How long to wait when no jobs are available
    pub poll_interval: Duration,
    pub worker_id: String,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(5),
            worker_id: format!("runner-{}", Uuid::new_v4()),
        }
    }
}

/// Background service that processes jobs from the queue.
pub struct JobRunner {
    job_queue: Arc<dyn JobQueue>,
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
    config: JobRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(
        job_queue: Arc<dyn JobQueue>,
        registry: SharedJobRegistry,
        deps: Arc<ServerDeps>,
    ) -> Self {
        Self::with_config(job_queue, registry, deps, JobRunnerConfig::default())
    }

    pub fn with_config(
        job_queue: Arc<dyn JobQueue>,
        registry: SharedJobRegistry,
        deps: Arc<ServerDeps>,
        config: JobRunnerConfig,
    ) -> Self {
        Self {
            job_queue,
            registry,
            deps,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Call `store(true, Ordering::SeqCst)` on the returned flag to stop the loop.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Claim one batch and run it. Returns how many jobs were processed.
    pub async fn run_once(&self) -> Result<usize> {
        let jobs = self
            .job_queue
            .claim(&self.config.worker_id, self.config.batch_size)
            .await?;

        if !jobs.is_empty() {
            debug!(count = jobs.len(), "claimed jobs");
        }

        let count = jobs.len();
        for job in jobs {
            self.process(job).await;
        }
        Ok(count)
    }

    async fn process(&self, job: Job) {
        let job_id = job.id;
        let job_type = job.job_type.clone();

        debug!(job_id = %job_id, job_type = %job_type, attempt = job.attempt, "executing job");

        match self.registry.execute(&job, self.deps.clone()).await {
            Ok(()) => {
                info!(job_id = %job_id, job_type = %job_type, "job succeeded");
                if let Err(e) = self.job_queue.mark_succeeded(job_id).await {
                    error!(job_id = %job_id, error = %e, "failed to mark job as succeeded");
                }
            }
            Err(e) => {
                warn!(job_id = %job_id, job_type = %job_type, error = %e, "job failed");

                let error_kind = classify_error(&e);
                if let Err(mark_err) = self
                    .job_queue
                    .mark_failed(job_id, &e.to_string(), error_kind)
                    .await
                {
                    error!(job_id = %job_id, error = %mark_err, "failed to mark job as failed");
                }
            }
        }
    }

    /// Run the job runner until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "job runner starting"
        );

        while !self.is_shutdown_requested() {
            match self.run_once().await {
                Ok(0) => tokio::time::sleep(self.config.poll_interval).await,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "failed to claim jobs");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "job runner stopped");
        Ok(())
    }
}

/// Classify an error to determine retry behavior.
fn classify_error(error: &anyhow::Error) -> ErrorKind {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("not found")
        || error_str.contains("invalid")
        || error_str.contains("permission denied")
        || error_str.contains("unknown job type")
    {
        return ErrorKind::NonRetryable;
    }

    if error_str.contains("deserialize") || error_str.contains("parse") {
        return ErrorKind::NonRetryable;
    }

    // Everything else is retryable (network errors, timeouts, etc.)
    ErrorKind::Retryable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = JobRunnerConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(config.worker_id.starts_with("runner-"));
    }

    #[test]
    fn test_classify_error_retryable() {
        let error = anyhow::anyhow!("connection reset by peer");
        assert_eq!(classify_error(&error), ErrorKind::Retryable);
    }

    #[test]
    fn test_classify_error_permanent() {
        assert_eq!(
            classify_error(&anyhow::anyhow!("Unknown job type: nope")),
            ErrorKind::NonRetryable
        );
        assert_eq!(
            classify_error(&anyhow::anyhow!("Failed to deserialize delete_users")),
            ErrorKind::NonRetryable
        );
    }
}
