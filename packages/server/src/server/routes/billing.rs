//! Subscription, plan and invoice endpoints for the signed-in user.

use axum::{extract::Extension, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::common::AuthError;
use crate::domains::billing::actions::{self, SubscriptionInput};
use crate::domains::user::models::User;
use crate::server::app::AppState;
use crate::server::error::{ApiError, JsonInput};
use crate::server::middleware::AuthUser;

/// The token may outlive the account it was issued for.
async fn current_user(auth: &AuthUser, state: &AppState) -> Result<User, ApiError> {
    User::find_by_id(auth.user_id, &state.deps.db_pool)
        .await?
        .ok_or_else(|| AuthError::AuthenticationRequired.into())
}

pub async fn list_plans(Extension(state): Extension<AppState>) -> Json<Value> {
    Json(json!({ "data": { "plans": state.deps.plans.all() } }))
}

pub async fn create_subscription(
    Extension(state): Extension<AppState>,
    auth: AuthUser,
    JsonInput(input): JsonInput<SubscriptionInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = current_user(&auth, &state).await?;
    let subscription = actions::create_subscription(&user, input, &state.deps).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": { "plan": subscription.plan } })),
    ))
}

pub async fn update_payment_method(
    Extension(state): Extension<AppState>,
    auth: AuthUser,
    JsonInput(input): JsonInput<SubscriptionInput>,
) -> Result<Json<Value>, ApiError> {
    let user = current_user(&auth, &state).await?;
    let credit_card = actions::update_payment_method(&user, input, &state.deps).await?;

    Ok(Json(json!({ "data": { "credit_card": credit_card } })))
}

pub async fn billing_info(
    Extension(state): Extension<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = current_user(&auth, &state).await?;
    let info = actions::billing_info(&user, &state.deps).await?;

    Ok(Json(json!({ "data": info })))
}

pub async fn cancel_subscription(
    Extension(state): Extension<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&auth, &state).await?;
    actions::cancel_subscription(&user, &state.deps).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_plan(
    Extension(state): Extension<AppState>,
    auth: AuthUser,
    JsonInput(input): JsonInput<SubscriptionInput>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&auth, &state).await?;
    actions::change_plan(&user, input, &state.deps).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn invoices(
    Extension(state): Extension<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = current_user(&auth, &state).await?;
    let history = actions::invoice_history(&user, &state.deps).await?;

    Ok(Json(json!({ "data": history })))
}
