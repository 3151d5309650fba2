//! Outgoing mail.
//!
//! Delivery transport is an external collaborator; `LogMailer` records each
//! message through `tracing` so deployments can ship it to whatever relay
//! consumes the logs.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{BaseMailer, MailMessage};

pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl BaseMailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        info!(
            from = %self.sender,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "outgoing mail"
        );
        Ok(())
    }
}
