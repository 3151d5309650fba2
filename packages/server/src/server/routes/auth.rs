//! `/api/auth`: sign in and sign out.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::domains::auth::actions::{self, AuthenticateResult, Credentials};
use crate::domains::auth::AccessToken;
use crate::server::app::AppState;
use crate::server::error::{ApiError, JsonInput};
use crate::server::middleware::{AuthUser, ClientIp, ACCESS_COOKIE, CSRF_COOKIE};

fn cookie(name: &str, value: &str, max_age: i64, http_only: bool, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; Max-Age={}; SameSite=Lax", name, value, max_age);
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Access cookie (HttpOnly) and the csrf cookie scripts read for the
/// `X-CSRF-TOKEN` header.
fn session_cookies(token: &AccessToken, secure: bool) -> [(axum::http::HeaderName, String); 2] {
    let max_age = (token.expires_at - Utc::now()).num_seconds().max(0);
    [
        (SET_COOKIE, cookie(ACCESS_COOKIE, &token.token, max_age, true, secure)),
        (SET_COOKIE, cookie(CSRF_COOKIE, &token.csrf, max_age, false, secure)),
    ]
}

fn expired_cookies(secure: bool) -> [(axum::http::HeaderName, String); 2] {
    [
        (SET_COOKIE, cookie(ACCESS_COOKIE, "", 0, true, secure)),
        (SET_COOKIE, cookie(CSRF_COOKIE, "", 0, false, secure)),
    ]
}

pub async fn sign_in(
    Extension(state): Extension<AppState>,
    client_ip: Option<Extension<ClientIp>>,
    JsonInput(credentials): JsonInput<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let ip = client_ip.map(|Extension(ClientIp(ip))| ip.to_string());

    match actions::authenticate(credentials, ip.as_deref(), &state.deps).await? {
        AuthenticateResult::Invalid(errors) => Err(ApiError::Validation(errors)),
        AuthenticateResult::Authenticated { token, .. } => Ok((
            StatusCode::OK,
            AppendHeaders(session_cookies(&token, state.cookie_secure)),
            Json(json!({ "data": { "access_token": token.token } })),
        )),
    }
}

pub async fn sign_out(
    Extension(state): Extension<AppState>,
    _user: AuthUser,
) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        AppendHeaders(expired_cookies(state.cookie_secure)),
    )
}
