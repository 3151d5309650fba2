//! `/api/v1/admin`: admin-only dashboard and user management.

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::domains::admin::actions::{self, BulkDeleteInput, UpdateUserInput, UserListQuery};
use crate::server::app::AppState;
use crate::server::error::{ApiError, JsonInput};
use crate::server::middleware::AdminUser;

pub async fn dashboard(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
) -> Result<Json<Value>, ApiError> {
    let dashboard = actions::dashboard(&state.deps).await?;
    Ok(Json(json!({ "data": dashboard })))
}

pub async fn list_users(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(|_| ApiError::invalid_input())?;
    let page = actions::list_users(query, &state.deps).await?;

    Ok(Json(json!({
        "data": {
            "users": page.items,
            "page": page.page,
            "per_page": page.per_page,
            "total": page.total,
            "pages": page.pages,
            "has_next": page.has_next,
            "has_prev": page.has_prev,
            "next_num": page.next_num,
            "prev_num": page.prev_num,
        }
    })))
}

pub async fn show_user(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let overview = actions::user_overview(&username, &state.deps).await?;
    Ok(Json(json!({ "data": overview })))
}

pub async fn update_user(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(username): Path<String>,
    JsonInput(input): JsonInput<UpdateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = actions::update_user(&username, input, &state.deps).await?;
    let location = format!("/api/v1/admin/users/{}", user.username);

    Ok((StatusCode::NO_CONTENT, [(LOCATION, location)]))
}

pub async fn cancel_subscription(
    Extension(state): Extension<AppState>,
    _admin: AdminUser,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    actions::cancel_user_subscription(&username, &state.deps).await?;

    Ok(Json(json!({
        "data": {
            "deleted": true,
            "message": "User's subscription has been cancelled."
        }
    })))
}

pub async fn bulk_delete(
    Extension(state): Extension<AppState>,
    AdminUser(admin): AdminUser,
    JsonInput(input): JsonInput<BulkDeleteInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let scheduled = actions::schedule_bulk_delete(admin.user_id, input, &state.deps).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "data": { "scheduled": scheduled } })),
    ))
}
