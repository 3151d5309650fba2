//! Admin dashboard counts

use serde::Serialize;

use crate::domains::admin::errors::AdminError;
use crate::domains::billing::models::Subscription;
use crate::domains::user::models::User;
use crate::kernel::ServerDeps;

/// `(count, key)` pairs plus their sum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupAndCount {
    pub query: Vec<(i64, String)>,
    pub total: i64,
}

impl GroupAndCount {
    pub fn new(query: Vec<(i64, String)>) -> Self {
        let total = query.iter().map(|(count, _)| count).sum();
        Self { query, total }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub group_and_count_users: GroupAndCount,
    pub group_and_count_plans: GroupAndCount,
}

pub async fn dashboard(deps: &ServerDeps) -> Result<Dashboard, AdminError> {
    let users = User::group_and_count_roles(&deps.db_pool).await?;
    let plans = Subscription::group_and_count_plans(&deps.db_pool).await?;

    Ok(Dashboard {
        group_and_count_users: GroupAndCount::new(users),
        group_and_count_plans: GroupAndCount::new(plans),
    })
}
