//! HTTP error type. Every handler returns `Result<_, ApiError>`.
//!
//! Bodies are always `{"error": ...}`: a message string, a field → messages
//! map for validation failures, or `{"message": ...}` for the admin guard.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::common::{AuthError, ValidationErrors};
use crate::domains::admin::AdminError;
use crate::domains::billing::BillingError;
use crate::domains::user::UserError;
use crate::kernel::GatewayError;

pub const INVALID_INPUT: &str = "Invalid input.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Admin required.")]
    AdminRequired,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(ValidationErrors),

    #[error("{0}")]
    Unprocessable(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid_input() -> Self {
        ApiError::BadRequest(INVALID_INPUT.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::AdminRequired | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Validation(errors) => json!({ "error": errors }),
            Self::AdminRequired => json!({ "error": { "message": "Admin required." } }),
            Self::Internal(e) => {
                error!(error = %e, "request failed");
                json!({ "error": "Internal server error." })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        if matches!(e, GatewayError::Authentication | GatewayError::Other(_)) {
            error!(error = %e, "payment gateway failure");
        }
        ApiError::BadRequest(e.user_message())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::AuthenticationRequired | AuthError::InvalidCredentials => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::AdminRequired => ApiError::AdminRequired,
            AuthError::AccountInactive => ApiError::BadRequest(e.to_string()),
            AuthError::DatabaseError(e) => e.into(),
            AuthError::InternalError(e) => ApiError::Internal(e),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::InvalidInput => ApiError::invalid_input(),
            UserError::Validation(errors) => ApiError::Validation(errors),
            UserError::InvalidVerificationToken => ApiError::BadRequest(e.to_string()),
            UserError::InternalError(e) => ApiError::Internal(e),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::AlreadySubscribed | BillingError::SamePlan => {
                ApiError::BadRequest(e.to_string())
            }
            BillingError::Validation(errors) => ApiError::Validation(errors),
            BillingError::PlanNotFound | BillingError::NoPaymentMethod | BillingError::NoCreditCard => {
                ApiError::NotFound(e.to_string())
            }
            BillingError::SubscriptionRequired => ApiError::Forbidden(e.to_string()),
            BillingError::Gateway(e) => e.into(),
            BillingError::DatabaseError(e) => e.into(),
            BillingError::InternalError(e) => ApiError::Internal(e),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::UserNotFound => ApiError::NotFound(e.to_string()),
            AdminError::Validation(errors) => ApiError::Validation(errors),
            AdminError::LastAdmin
            | AdminError::UsernameTaken
            | AdminError::NoActiveSubscription(_)
            | AdminError::NothingSelected => ApiError::BadRequest(e.to_string()),
            AdminError::Billing(e) => e.into(),
            AdminError::InternalError(e) => ApiError::Internal(e),
        }
    }
}

/// JSON body extractor for endpoints that need a non-empty object.
///
/// Missing, malformed, non-object or empty bodies, and bodies whose fields
/// have the wrong types, are all rejected with 400 `Invalid input.`.
pub struct JsonInput<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonInput<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|_| ApiError::invalid_input())?;

        parse_object(value).map(JsonInput)
    }
}

fn parse_object<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    match &value {
        Value::Object(map) if !map.is_empty() => {}
        _ => return Err(ApiError::invalid_input()),
    }
    serde_json::from_value(value).map_err(|_| ApiError::invalid_input())
}
