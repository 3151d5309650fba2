use thiserror::Error;

use crate::common::ValidationErrors;
use crate::kernel::GatewayError;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("You already have an active subscription.")]
    AlreadySubscribed,

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Plan not found.")]
    PlanNotFound,

    #[error("You do not have a payment method on file.")]
    NoPaymentMethod,

    #[error("No credit card information was found.")]
    NoCreditCard,

    #[error("You need an active subscription to access this resource.")]
    SubscriptionRequired,

    #[error("New plan can't be the same as your old plan")]
    SamePlan,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
