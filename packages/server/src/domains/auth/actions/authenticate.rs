//! Authenticate action

use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{AuthError, ValidationErrors, Validator};
use crate::domains::auth::jwt::AccessToken;
use crate::domains::user::models::User;
use crate::domains::user::password::verify_password;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    fn validate(&self) -> Result<(&str, &str), ValidationErrors> {
        let mut v = Validator::new();

        let identity = v.required("identity", self.identity.as_deref()).map(str::trim);
        if let Some(identity) = identity {
            v.length("identity", identity, 3, 255);
        }
        let password = v.required("password", self.password.as_deref());
        if let Some(password) = password {
            v.length("password", password, 8, 128);
        }

        v.finish()?;
        Ok((identity.unwrap_or_default(), password.unwrap_or_default()))
    }
}

/// Outcome of authenticate: either a token or field errors to report.
pub enum AuthenticateResult {
    Authenticated { user: User, token: AccessToken },
    Invalid(ValidationErrors),
}

/// Check credentials, record the sign-in and mint an access token.
///
/// The identity may be an email address or a username.
pub async fn authenticate(
    credentials: Credentials,
    ip: Option<&str>,
    deps: &ServerDeps,
) -> Result<AuthenticateResult, AuthError> {
    let (identity, password) = match credentials.validate() {
        Ok(valid) => valid,
        Err(errors) => return Ok(AuthenticateResult::Invalid(errors)),
    };

    let user = match User::find_by_identity(identity, &deps.db_pool).await? {
        Some(user) if verify_password(password, &user.password) => user,
        _ => {
            warn!(identity = %identity, "failed sign-in attempt");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }

    let user = User::update_activity(user.id, ip, &deps.db_pool).await?;
    let token = deps
        .jwt_service
        .create_token(user.id, &user.username, user.role)?;

    info!(user_id = %user.id, sign_in_count = user.sign_in_count, "user signed in");
    Ok(AuthenticateResult::Authenticated { user, token })
}
