//! Gateway webhook ingestion
//!
//! The posted body is only trusted for its event id; the event itself is
//! re-fetched from the gateway before anything is stored.

use tracing::{debug, info};

use crate::domains::billing::errors::BillingError;
use crate::domains::billing::models::{CreditCard, Invoice, ParsedInvoice};
use crate::domains::user::models::User;
use crate::kernel::ServerDeps;

/// Event types that produce a local invoice
pub const INVOICE_CREATED: &str = "invoice.created";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Invoice stored for the matching user
    Saved,
    /// No user with that customer id, or the user has no card on file
    Skipped,
    /// Event type we do not track
    Ignored,
}

pub async fn handle_webhook_event(
    event_id: &str,
    deps: &ServerDeps,
) -> Result<WebhookOutcome, BillingError> {
    let event = deps.gateway.retrieve_event(event_id).await?;

    if event.event_type != INVOICE_CREATED {
        debug!(event_id = %event.id, event_type = %event.event_type, "webhook event ignored");
        return Ok(WebhookOutcome::Ignored);
    }

    let parsed = ParsedInvoice::from_event_object(&event.object)?;

    let Some(user) = User::find_by_payment_id(&parsed.payment_id, &deps.db_pool).await? else {
        debug!(payment_id = %parsed.payment_id, "no user for invoice customer");
        return Ok(WebhookOutcome::Skipped);
    };
    let Some(card) = CreditCard::find_by_user(user.id, &deps.db_pool).await? else {
        debug!(user_id = %user.id, "no card on file for invoice");
        return Ok(WebhookOutcome::Skipped);
    };

    let invoice = Invoice::create(user.id, &parsed, &card, &deps.db_pool).await?;
    info!(user_id = %user.id, invoice_id = %invoice.id, event_id = %event.id, "invoice recorded");
    Ok(WebhookOutcome::Saved)
}
