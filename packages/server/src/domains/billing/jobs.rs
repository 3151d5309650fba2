//! Background jobs owned by the billing domain.

use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domains::billing::models::CreditCard;
use crate::kernel::jobs::CommandMeta;
use crate::kernel::ServerDeps;

/// Flag cards that expire within the threshold of `compare_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkExpiringCreditCardsJob {
    pub compare_date: NaiveDate,
}

impl MarkExpiringCreditCardsJob {
    pub const JOB_TYPE: &'static str = "mark_expiring_credit_cards";

    pub fn today() -> Self {
        Self {
            compare_date: Utc::now().date_naive(),
        }
    }
}

impl CommandMeta for MarkExpiringCreditCardsJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }
}

pub async fn mark_expiring_credit_cards(
    job: MarkExpiringCreditCardsJob,
    deps: Arc<ServerDeps>,
) -> Result<()> {
    let flagged = CreditCard::mark_old_credit_cards(job.compare_date, &deps.db_pool).await?;
    info!(compare_date = %job.compare_date, flagged, "expiring credit cards marked");
    Ok(())
}
