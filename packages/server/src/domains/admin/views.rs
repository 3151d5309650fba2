//! Serializable user views for the admin API. Password hashes never leave
//! the user model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::{Role, UserId};
use crate::domains::billing::models::{CreditCard, Subscription};
use crate::domains::user::models::User;

/// Row of the admin user listing
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub sign_in_count: i32,
    pub last_sign_in_on: Option<DateTime<Utc>>,
    pub created_on: DateTime<Utc>,
    pub payment_id: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            sign_in_count: user.sign_in_count,
            last_sign_in_on: user.last_sign_in_on,
            created_on: user.created_on,
            payment_id: user.payment_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub sign_in_count: i32,
    pub current_sign_in_on: Option<DateTime<Utc>>,
    pub current_sign_in_ip: Option<String>,
    pub last_sign_in_on: Option<DateTime<Utc>>,
    pub last_sign_in_ip: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub credit_card: Option<CreditCard>,
    pub subscription: Option<Subscription>,
    pub cancelled_subscription_on: Option<DateTime<Utc>>,
}

impl UserDetail {
    pub fn new(
        user: User,
        credit_card: Option<CreditCard>,
        subscription: Option<Subscription>,
    ) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            sign_in_count: user.sign_in_count,
            current_sign_in_on: user.current_sign_in_on,
            current_sign_in_ip: user.current_sign_in_ip,
            last_sign_in_on: user.last_sign_in_on,
            last_sign_in_ip: user.last_sign_in_ip,
            created_on: user.created_on,
            updated_on: user.updated_on,
            credit_card,
            subscription,
            cancelled_subscription_on: user.cancelled_subscription_on,
        }
    }
}
