use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::common::UserId;
use crate::domains::admin::actions;
use crate::kernel::jobs::CommandMeta;
use crate::kernel::ServerDeps;

/// Delete a batch of users chosen by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUsersJob {
    pub ids: Vec<UserId>,
}

impl DeleteUsersJob {
    pub const JOB_TYPE: &'static str = "delete_users";
}

impl CommandMeta for DeleteUsersJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }
}

pub async fn delete_users(job: DeleteUsersJob, deps: Arc<ServerDeps>) -> Result<()> {
    actions::bulk_delete(&job.ids, &deps).await?;
    Ok(())
}
