//! Job registry for deserializing and executing jobs.
//!
//! The registry maps job type strings (e.g., "delete_users") to handlers that
//! rebuild the typed command from JSON and run it against `ServerDeps`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use super::job::Job;
use super::queue::CommandMeta;
use crate::kernel::ServerDeps;

type BoxedHandler = Box<
    dyn Fn(serde_json::Value, Arc<ServerDeps>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// Registry that maps job type strings to handlers.
///
/// Each domain registers its job types at startup. When the JobRunner
/// claims a job, it uses this registry to deserialize and execute
/// the job in one step.
///
/// # Example
///
/// ```ignore
/// let mut registry = JobRegistry::new();
/// registry.register::<DeleteUsersJob, _, _>(
///     DeleteUsersJob::JOB_TYPE,
///     |job, deps| async move { admin_actions::bulk_delete(&job.ids, &deps).await.map(|_| ()) },
/// );
/// ```
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<&'static str, BoxedHandler>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job type with its handler.
    pub fn register<J, F, Fut>(&mut self, job_type: &'static str, handler: F)
    where
        J: CommandMeta + DeserializeOwned + Send + Sync + 'static,
        F: Fn(J, Arc<ServerDeps>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed_handler: BoxedHandler = Box::new(move |value, deps| {
            let handler = handler.clone();
            Box::pin(async move {
                let job: J = serde_json::from_value(value)
                    .map_err(|e| anyhow!("Failed to deserialize {}: {}", job_type, e))?;
                handler(job, deps).await
            })
        });

        self.handlers.insert(job_type, boxed_handler);
    }

    /// Execute a claimed job using its registered handler.
    pub async fn execute(&self, job: &Job, deps: Arc<ServerDeps>) -> Result<()> {
        let handler = self
            .handlers
            .get(job.job_type.as_str())
            .ok_or_else(|| anyhow!("Unknown job type: {}", job.job_type))?;

        handler(job.args.clone(), deps).await
    }

    pub fn is_registered(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }
}

/// Thread-safe registry wrapped in Arc.
pub type SharedJobRegistry = Arc<JobRegistry>;
