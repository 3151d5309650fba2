//! Register action

use serde::Deserialize;
use tracing::info;

use crate::common::{Role, ValidationErrors, Validator};
use crate::domains::user::errors::UserError;
use crate::domains::user::jobs::DeliverVerificationEmailJob;
use crate::domains::user::models::{CreateUser, User};
use crate::domains::user::password::hash_password;
use crate::kernel::jobs::JobQueueExt;
use crate::kernel::ServerDeps;

/// Registration payload as posted by the client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug)]
struct ValidRegistration {
    email: String,
    username: String,
    password: String,
}

impl RegistrationInput {
    /// Shape checks that need no database access
    fn validate(&self) -> Result<ValidRegistration, ValidationErrors> {
        let mut v = Validator::new();

        let email = v.required("email", self.email.as_deref()).map(str::trim);
        if let Some(email) = email {
            if v.length("email", email, 3, 255) {
                v.email("email", email);
            }
        }

        let username = v.required("username", self.username.as_deref()).map(str::trim);
        if let Some(username) = username {
            if v.length("username", username, 3, 24) {
                v.username("username", username);
            }
        }

        let password = v.required("password", self.password.as_deref());
        if let Some(password) = password {
            v.length("password", password, 8, 128);
        }

        v.finish()?;

        Ok(ValidRegistration {
            email: email.unwrap_or_default().to_string(),
            username: username.unwrap_or_default().to_string(),
            password: password.unwrap_or_default().to_string(),
        })
    }
}

/// Create an inactive member account and send it a verification email.
pub async fn register(input: RegistrationInput, deps: &ServerDeps) -> Result<User, UserError> {
    let valid = input.validate()?;
    let pool = &deps.db_pool;

    let mut taken = ValidationErrors::new();
    if User::find_by_email(&valid.email, pool).await?.is_some() {
        taken.add("email", format!("{} already exists.", valid.email));
    }
    if User::find_by_username(&valid.username, pool).await?.is_some() {
        taken.add("username", format!("{} already exists.", valid.username));
    }
    if !taken.is_empty() {
        return Err(taken.into());
    }

    let user = User::create(
        CreateUser {
            username: valid.username,
            email: valid.email,
            password_hash: hash_password(&valid.password)?,
            role: Role::Member,
            is_active: false,
        },
        pool,
    )
    .await?;

    queue_verification_email(&user, deps).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub(crate) async fn queue_verification_email(user: &User, deps: &ServerDeps) -> Result<(), UserError> {
    let token = deps.jwt_service.create_verification_token(&user.email)?;
    deps.job_queue
        .enqueue(DeliverVerificationEmailJob {
            user_id: user.id,
            token,
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str, username: &str, password: &str) -> RegistrationInput {
        RegistrationInput {
            email: Some(email.to_string()),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn accepts_well_formed_input() {
        let valid = input(" dev@local.host ", "dev_1", "devpassword")
            .validate()
            .unwrap();
        assert_eq!(valid.email, "dev@local.host");
        assert_eq!(valid.username, "dev_1");
    }

    #[test]
    fn reports_every_bad_field() {
        let errors = input("nope", "a b", "short").validate().unwrap_err();
        assert!(errors.has("email"));
        assert_eq!(
            errors.get("username"),
            Some(&["Username must be letters, numbers and underscores only.".to_string()][..])
        );
        assert!(errors.has("password"));
    }

    #[test]
    fn missing_fields_are_required() {
        let errors = RegistrationInput::default().validate().unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn username_length_is_bounded() {
        let errors = input("dev@local.host", "ab", "devpassword")
            .validate()
            .unwrap_err();
        assert_eq!(
            errors.get("username"),
            Some(&["Length must be between 3 and 24.".to_string()][..])
        );
    }
}
