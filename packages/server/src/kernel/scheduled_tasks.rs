//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Scheduled tasks never do the work themselves; they enqueue a job so the
//! work runs through the queue with its retry policy.
//!
//! ```text
//! Scheduler (daily at midnight)
//!     │
//!     └─► enqueue mark_expiring_credit_cards
//!             └─► JobRunner → billing::mark_old_credit_cards(today)
//! ```

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::billing::jobs::MarkExpiringCreditCardsJob;
use crate::kernel::jobs::{JobQueue, JobQueueExt};

/// Cron expression (with seconds) for the card expiry sweep.
pub const CARD_EXPIRY_SCHEDULE: &str = "0 0 0 * * *";

/// Start all scheduled tasks
pub async fn start_scheduler(job_queue: Arc<dyn JobQueue>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let expiry_job = Job::new_async(CARD_EXPIRY_SCHEDULE, move |_uuid, _lock| {
        let queue = job_queue.clone();
        Box::pin(async move {
            match queue.enqueue(MarkExpiringCreditCardsJob::today()).await {
                Ok(job_id) => tracing::info!(%job_id, "card expiry sweep enqueued"),
                Err(e) => tracing::error!("Card expiry sweep failed to enqueue: {}", e),
            }
        })
    })?;

    scheduler.add(expiry_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started");
    Ok(scheduler)
}
