//! Admin user management actions

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::{Page, PageParams, Role, Validator};
use crate::domains::admin::errors::AdminError;
use crate::domains::admin::views::{UserDetail, UserSummary};
use crate::domains::billing::actions as billing;
use crate::domains::billing::models::{CreditCard, Invoice, Subscription, UpcomingInvoice};
use crate::domains::billing::BillingError;
use crate::domains::user::models::{SortDirection, User, UserSort};
use crate::kernel::ServerDeps;

/// Query string of the admin user listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl UpdateUserInput {
    fn validate(&self) -> Result<(String, Role), AdminError> {
        let mut v = Validator::new();

        let username = v.required("username", self.username.as_deref()).map(str::trim);
        if let Some(username) = username {
            if v.length("username", username, 3, 24) {
                v.username("username", username);
            }
        }

        let role = v.required("role", self.role.as_deref()).map(str::trim);
        let role = match role.map(str::parse::<Role>) {
            Some(Ok(role)) => role,
            Some(Err(message)) => {
                v.add("role", message);
                Role::default()
            }
            None => Role::default(),
        };

        v.finish()?;
        Ok((username.unwrap_or_default().to_string(), role))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    pub user: UserDetail,
    pub invoices: Vec<Invoice>,
    pub upcoming_invoice: Option<UpcomingInvoice>,
}

pub async fn list_users(
    query: UserListQuery,
    deps: &ServerDeps,
) -> Result<Page<UserSummary>, AdminError> {
    let params = PageParams::new(query.page, query.per_page);
    let (users, total) = User::search(
        query.q.as_deref(),
        UserSort::parse(query.sort.as_deref()),
        SortDirection::parse(query.direction.as_deref()),
        &params,
        &deps.db_pool,
    )
    .await?;

    Ok(Page::new(users, &params, total).map(UserSummary::from))
}

async fn find_user(username: &str, deps: &ServerDeps) -> Result<User, AdminError> {
    User::find_by_username(username, &deps.db_pool)
        .await?
        .ok_or(AdminError::UserNotFound)
}

/// Detail view with billing history and the gateway's next invoice.
pub async fn user_overview(username: &str, deps: &ServerDeps) -> Result<UserOverview, AdminError> {
    let user = find_user(username, deps).await?;

    let credit_card = CreditCard::find_by_user(user.id, &deps.db_pool).await?;
    let subscription = Subscription::find_by_user(user.id, &deps.db_pool).await?;
    let invoices = Invoice::billing_history(user.id, &deps.db_pool).await?;
    let upcoming_invoice = billing::upcoming_invoice(&user, deps).await?;

    Ok(UserOverview {
        user: UserDetail::new(user, credit_card, subscription),
        invoices,
        upcoming_invoice,
    })
}

/// Rename a user and/or change their role. Returns the updated user.
pub async fn update_user(
    username: &str,
    input: UpdateUserInput,
    deps: &ServerDeps,
) -> Result<User, AdminError> {
    let user = find_user(username, deps).await?;
    let (new_username, new_role) = input.validate()?;

    if new_username != user.username
        && User::find_by_username(&new_username, &deps.db_pool)
            .await?
            .is_some()
    {
        return Err(AdminError::UsernameTaken);
    }

    let updated = User::update_username_and_role(user.id, &new_username, new_role, &deps.db_pool)
        .await?
        .ok_or(AdminError::LastAdmin)?;

    info!(
        user_id = %updated.id,
        from = %user.username,
        to = %updated.username,
        role = %updated.role,
        "user updated by admin"
    );
    Ok(updated)
}

pub async fn cancel_user_subscription(username: &str, deps: &ServerDeps) -> Result<(), AdminError> {
    let user = find_user(username, deps).await?;

    match billing::cancel_subscription(&user, deps).await {
        Err(BillingError::SubscriptionRequired) => {
            Err(AdminError::NoActiveSubscription(user.username))
        }
        other => Ok(other?),
    }
}
