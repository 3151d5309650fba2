//! Email verification actions

use tracing::{debug, info};

use crate::domains::user::actions::register::queue_verification_email;
use crate::domains::user::errors::UserError;
use crate::domains::user::models::User;
use crate::kernel::ServerDeps;

/// Activate the account a verification token was issued for.
pub async fn verify_email(token: &str, deps: &ServerDeps) -> Result<User, UserError> {
    let email = deps
        .jwt_service
        .verify_verification_token(token)
        .map_err(|e| {
            debug!(error = %e, "rejected verification token");
            UserError::InvalidVerificationToken
        })?;

    // The account may have been deleted since the token was issued.
    let user = User::activate(&email, &deps.db_pool)
        .await?
        .ok_or(UserError::InvalidVerificationToken)?;

    info!(user_id = %user.id, "account verified");
    Ok(user)
}

/// Send a fresh verification email to an inactive account.
///
/// Unknown or already active identities are ignored, so callers cannot
/// discover which accounts exist.
pub async fn resend_verification(identity: &str, deps: &ServerDeps) -> Result<(), UserError> {
    match User::find_by_identity(identity.trim(), &deps.db_pool).await? {
        Some(user) if !user.is_active => {
            queue_verification_email(&user, deps).await?;
            info!(user_id = %user.id, "verification email re-sent");
        }
        _ => debug!("verification resend ignored"),
    }
    Ok(())
}
