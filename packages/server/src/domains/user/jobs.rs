//! Background jobs owned by the user domain.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::UserId;
use crate::domains::user::models::User;
use crate::kernel::jobs::CommandMeta;
use crate::kernel::{MailMessage, ServerDeps};

/// Mail a verification link to a freshly registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverVerificationEmailJob {
    pub user_id: UserId,
    pub token: String,
}

impl DeliverVerificationEmailJob {
    pub const JOB_TYPE: &'static str = "deliver_verification_email";
}

impl CommandMeta for DeliverVerificationEmailJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }
}

pub fn verification_link(app_base_url: &str, token: &str) -> String {
    format!("{}/verify?token={}", app_base_url.trim_end_matches('/'), token)
}

pub async fn deliver_verification_email(
    job: DeliverVerificationEmailJob,
    deps: Arc<ServerDeps>,
) -> Result<()> {
    let Some(user) = User::find_by_id(job.user_id, &deps.db_pool).await? else {
        warn!(user_id = %job.user_id, "user gone before verification email was sent");
        return Ok(());
    };

    let link = verification_link(&deps.app_base_url, &job.token);
    let body = format!(
        "Hi {},\n\nConfirm your account by visiting the link below. It expires in 24 hours.\n\n{}\n\nVerification token: {}\n",
        user.username, link, job.token
    );

    deps.mailer
        .send(MailMessage {
            to: user.email.clone(),
            subject: "Account Verification".to_string(),
            body,
        })
        .await?;

    info!(user_id = %user.id, "verification email sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_joins_base_url_and_token() {
        assert_eq!(
            verification_link("http://localhost:8000/", "abc"),
            "http://localhost:8000/verify?token=abc"
        );
    }
}
