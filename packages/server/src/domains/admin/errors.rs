use thiserror::Error;

use crate::common::ValidationErrors;
use crate::domains::billing::BillingError;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("User not found.")]
    UserNotFound,

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("User is the last admin in the system.")]
    LastAdmin,

    #[error("Username is already taken.")]
    UsernameTaken,

    #[error("{0} doesn't have an active subscription.")]
    NoActiveSubscription(String),

    #[error("No users were selected.")]
    NothingSelected,

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
