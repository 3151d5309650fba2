//! Job infrastructure for background command execution.
//!
//! - [`PostgresJobQueue`] - Database-backed job queue
//! - [`JobRegistry`] - Maps job types to domain handlers
//! - [`JobRunner`] - Long-running service that polls and executes jobs
//! - [`Job`] - Job model
//!
//! Background commands live in their respective domains; this module only
//! provides the infrastructure.

mod job;
mod queue;
mod registry;
mod runner;

pub use job::{ErrorKind, Job, JobStatus};
pub use queue::{CommandMeta, JobQueue, JobQueueExt, NewJob, PostgresJobQueue};
pub use registry::{JobRegistry, SharedJobRegistry};
pub use runner::{JobRunner, JobRunnerConfig};
