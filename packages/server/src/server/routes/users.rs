//! `/api/v1/users`: registration and email verification.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domains::user::actions::{self, RegistrationInput};
use crate::domains::user::UserError;
use crate::server::app::AppState;
use crate::server::error::{ApiError, JsonInput};

#[derive(Debug, Deserialize)]
pub struct VerifyInput {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResendInput {
    #[serde(default)]
    pub identity: Option<String>,
}

pub async fn register(
    Extension(state): Extension<AppState>,
    JsonInput(input): JsonInput<RegistrationInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = actions::register(input, &state.deps).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": { "email": user.email, "username": user.username } })),
    ))
}

pub async fn verify(
    Extension(state): Extension<AppState>,
    JsonInput(input): JsonInput<VerifyInput>,
) -> Result<Json<Value>, ApiError> {
    let token = input
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(UserError::InvalidVerificationToken)?;
    let user = actions::verify_email(token.trim(), &state.deps).await?;

    Ok(Json(json!({ "data": { "username": user.username, "active": user.is_active } })))
}

/// Always 202 so the response never reveals whether an account exists.
pub async fn resend_verification(
    Extension(state): Extension<AppState>,
    JsonInput(input): JsonInput<ResendInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Some(identity) = input.identity.filter(|i| !i.trim().is_empty()) {
        actions::resend_verification(&identity, &state.deps).await?;
    }
    Ok((StatusCode::ACCEPTED, Json(json!({}))))
}
