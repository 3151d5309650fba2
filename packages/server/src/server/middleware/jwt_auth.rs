use std::sync::Arc;

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::common::{AuthError, Role, UserId};
use crate::domains::auth::JwtService;
use crate::server::error::ApiError;

pub const ACCESS_COOKIE: &str = "access_token_cookie";
pub const CSRF_COOKIE: &str = "csrf_access_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Authenticated user information from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

/// An authenticated user whose token carries the admin role
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthUser);

/// JWT authentication middleware
///
/// Reads the token from `Authorization: Bearer` or the access cookie, verifies
/// it, and adds AuthUser to request extensions. Requests without a valid
/// token continue without AuthUser; the extractors decide what is protected.
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(user) = extract_auth_user(&request, &jwt_service) {
        debug!(user_id = %user.user_id, role = %user.role, "authenticated request");
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

fn cookie<'a>(request: &'a Request<Body>, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Extract and verify JWT token from request
fn extract_auth_user(request: &Request<Body>, jwt_service: &JwtService) -> Option<AuthUser> {
    let bearer = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let (token, from_cookie) = match bearer {
        Some(token) => (token, false),
        None => (cookie(request, ACCESS_COOKIE)?, true),
    };

    let claims = jwt_service.verify_token(token).ok()?;

    // Double-submit check for cookie sessions
    if from_cookie && is_state_changing(request.method()) {
        let header = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok());
        if header != Some(claims.csrf.as_str()) {
            debug!(user_id = %claims.user_id, "csrf check failed");
            return None;
        }
    }

    Some(AuthUser {
        user_id: claims.user_id,
        username: claims.username,
        role: claims.role,
    })
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AuthError::AuthenticationRequired.into())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AuthError::AdminRequired.into());
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test_secret", "test_issuer".to_string(), 1)
    }

    fn request(method: Method) -> axum::http::request::Builder {
        Request::builder().method(method).uri("/")
    }

    #[test]
    fn test_extract_token_with_bearer() {
        let jwt_service = service();
        let user_id = UserId::new();
        let token = jwt_service.create_token(user_id, "dev", Role::Admin).unwrap();

        let request = request(Method::GET)
            .header("authorization", format!("Bearer {}", token.token))
            .body(Body::empty())
            .unwrap();

        let auth_user = extract_auth_user(&request, &jwt_service).unwrap();
        assert_eq!(auth_user.user_id, user_id);
        assert_eq!(auth_user.role, Role::Admin);
    }

    #[test]
    fn test_cookie_read_needs_no_csrf() {
        let jwt_service = service();
        let token = jwt_service
            .create_token(UserId::new(), "dev", Role::Member)
            .unwrap();

        let request = request(Method::GET)
            .header(COOKIE, format!("theme=dark; {}={}", ACCESS_COOKIE, token.token))
            .body(Body::empty())
            .unwrap();

        assert!(extract_auth_user(&request, &jwt_service).is_some());
    }

    #[test]
    fn test_cookie_write_requires_matching_csrf() {
        let jwt_service = service();
        let token = jwt_service
            .create_token(UserId::new(), "dev", Role::Member)
            .unwrap();
        let cookie_header = format!("{}={}", ACCESS_COOKIE, token.token);

        let missing = request(Method::POST)
            .header(COOKIE, &cookie_header)
            .body(Body::empty())
            .unwrap();
        assert!(extract_auth_user(&missing, &jwt_service).is_none());

        let wrong = request(Method::DELETE)
            .header(COOKIE, &cookie_header)
            .header(CSRF_HEADER, "nope")
            .body(Body::empty())
            .unwrap();
        assert!(extract_auth_user(&wrong, &jwt_service).is_none());

        let matching = request(Method::PUT)
            .header(COOKIE, &cookie_header)
            .header(CSRF_HEADER, &token.csrf)
            .body(Body::empty())
            .unwrap();
        assert!(extract_auth_user(&matching, &jwt_service).is_some());
    }

    #[test]
    fn test_no_auth_header() {
        let request = request(Method::GET).body(Body::empty()).unwrap();
        assert!(extract_auth_user(&request, &service()).is_none());
    }

    #[test]
    fn test_invalid_token() {
        let request = request(Method::GET)
            .header("authorization", "Bearer invalid_token")
            .body(Body::empty())
            .unwrap();
        assert!(extract_auth_user(&request, &service()).is_none());
    }
}
