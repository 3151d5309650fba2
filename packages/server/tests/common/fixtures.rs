//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use anyhow::Result;
use chrono::NaiveDate;
use saas_core::common::Role;
use saas_core::domains::billing::models::{CardDetails, CreditCard, Subscription};
use saas_core::domains::user::models::{CreateUser, User};
use saas_core::domains::user::password::hash_password;
use saas_core::kernel::ServerDeps;
use sqlx::PgPool;

pub const TEST_PASSWORD: &str = "password";

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    role: Role,
    is_active: bool,
) -> Result<User> {
    User::create(
        CreateUser {
            username: username.to_string(),
            email: format!("{}@local.host", username),
            password_hash: hash_password(TEST_PASSWORD)?,
            role,
            is_active,
        },
        pool,
    )
    .await
}

/// Active member
pub async fn create_member(pool: &PgPool, username: &str) -> Result<User> {
    create_user(pool, username, Role::Member, true).await
}

/// Active admin
pub async fn create_admin(pool: &PgPool, username: &str) -> Result<User> {
    create_user(pool, username, Role::Admin, true).await
}

/// Give `user` a gateway customer `cus_<username>`, a subscription and a
/// Visa card expiring on `exp_date`. Returns the refreshed user.
pub async fn subscribe(
    pool: &PgPool,
    user: &User,
    plan: &str,
    exp_date: NaiveDate,
) -> Result<User> {
    let payment_id = format!("cus_{}", user.username);
    User::set_payment_details(user.id, &payment_id, "Test Customer", pool).await?;
    Subscription::create(user.id, plan, pool).await?;
    CreditCard::upsert(
        user.id,
        &CardDetails {
            brand: "Visa".to_string(),
            last4: "4242".to_string(),
            exp_date,
            is_expiring: false,
        },
        pool,
    )
    .await?;

    Ok(User::find_by_id(user.id, pool)
        .await?
        .expect("subscribed user exists"))
}

/// Card expiry far enough out never to count as expiring
pub fn distant_expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 12, 1).unwrap()
}

/// Access token for `user`, as sign-in would issue it
pub fn token_for(deps: &ServerDeps, user: &User) -> String {
    deps.jwt_service
        .create_token(user.id, &user.username, user.role)
        .unwrap()
        .token
}
