//! Bulk user deletion
//!
//! Scheduling resolves which users to delete and hands the ids to the
//! `delete_users` job; the job cancels each gateway subscription before
//! removing the account.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::common::{UserId, ValidationErrors};
use crate::domains::admin::errors::AdminError;
use crate::domains::admin::jobs::DeleteUsersJob;
use crate::domains::user::models::{DeleteOutcome, User};
use crate::kernel::jobs::JobQueueExt;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkDeleteScope {
    #[default]
    Selected,
    AllSearchResults,
}

impl BulkDeleteScope {
    fn parse(value: Option<&str>) -> Result<Self, ValidationErrors> {
        match value {
            None | Some("selected") => Ok(Self::Selected),
            Some("all_search_results") => Ok(Self::AllSearchResults),
            Some(_) => Err(ValidationErrors::single(
                "scope",
                "Must be one of: selected, all_search_results.",
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkDeleteInput {
    #[serde(default)]
    pub ids: Vec<UserId>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

/// Resolve the target ids, never including the acting admin.
fn without_actor(ids: Vec<UserId>, actor: UserId) -> Vec<UserId> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| *id != actor && seen.insert(*id))
        .collect()
}

/// Queue a `delete_users` job. Returns how many ids were scheduled.
pub async fn schedule_bulk_delete(
    actor: UserId,
    input: BulkDeleteInput,
    deps: &ServerDeps,
) -> Result<usize, AdminError> {
    let ids = match BulkDeleteScope::parse(input.scope.as_deref())? {
        BulkDeleteScope::Selected => input.ids,
        BulkDeleteScope::AllSearchResults => {
            User::search_ids(input.q.as_deref(), &deps.db_pool).await?
        }
    };

    let ids = without_actor(ids, actor);
    if ids.is_empty() {
        return Err(AdminError::NothingSelected);
    }

    let scheduled = ids.len();
    let job_id = deps.job_queue.enqueue(DeleteUsersJob { ids }).await?;

    info!(%job_id, scheduled, actor = %actor, "bulk delete scheduled");
    Ok(scheduled)
}

/// Delete users one by one, cancelling gateway subscriptions first.
///
/// A failure for one user is logged and skipped. The last remaining admin
/// is never deleted, whoever scheduled the job. Returns the number of users
/// actually deleted.
pub async fn bulk_delete(ids: &[UserId], deps: &ServerDeps) -> Result<usize, AdminError> {
    let mut deleted = 0;

    for &id in ids {
        let user = match User::find_by_id(id, &deps.db_pool).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(user_id = %id, "user already gone");
                continue;
            }
            Err(e) => {
                warn!(user_id = %id, error = %e, "failed to load user for deletion");
                continue;
            }
        };

        if user.role.is_admin() && is_last_admin(deps).await {
            warn!(user_id = %id, "refusing to delete the last admin");
            continue;
        }

        if let Some(payment_id) = user.payment_id.as_deref() {
            if let Err(e) = deps.gateway.cancel_subscription(payment_id).await {
                warn!(user_id = %id, payment_id = %payment_id, error = %e, "subscription cancel failed, user kept");
                continue;
            }
        }

        match User::delete_unless_last_admin(id, &deps.db_pool).await {
            Ok(DeleteOutcome::Deleted) => deleted += 1,
            Ok(DeleteOutcome::NotFound) => debug!(user_id = %id, "user deleted concurrently"),
            Ok(DeleteOutcome::LastAdmin) => warn!(user_id = %id, "refusing to delete the last admin"),
            Err(e) => warn!(user_id = %id, error = %e, "failed to delete user"),
        }
    }

    info!(requested = ids.len(), deleted, "bulk delete finished");
    Ok(deleted)
}

/// Checked before touching the gateway; the delete itself re-checks under lock.
async fn is_last_admin(deps: &ServerDeps) -> bool {
    match User::count_admins(&deps.db_pool).await {
        Ok(count) => count <= 1,
        Err(e) => {
            warn!(error = %e, "failed to count admins");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_defaults_to_selected() {
        assert_eq!(BulkDeleteScope::parse(None).unwrap(), BulkDeleteScope::Selected);
        assert_eq!(
            BulkDeleteScope::parse(Some("all_search_results")).unwrap(),
            BulkDeleteScope::AllSearchResults
        );
        assert!(BulkDeleteScope::parse(Some("everyone")).is_err());
    }

    #[test]
    fn actor_is_never_a_target() {
        let actor = UserId::new();
        let other = UserId::new();
        assert_eq!(without_actor(vec![other, actor, other], actor), vec![other]);
        assert!(without_actor(vec![actor], actor).is_empty());
    }
}
