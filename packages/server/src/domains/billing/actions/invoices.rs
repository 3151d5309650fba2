//! Billing history

use serde::Serialize;

use crate::domains::billing::errors::BillingError;
use crate::domains::billing::models::{Invoice, Subscription, UpcomingInvoice};
use crate::domains::user::models::User;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceHistory {
    pub invoices: Vec<Invoice>,
    pub upcoming_invoice: Option<UpcomingInvoice>,
}

/// Next bill from the gateway, or `None` when the user is not subscribed.
pub async fn upcoming_invoice(
    user: &User,
    deps: &ServerDeps,
) -> Result<Option<UpcomingInvoice>, BillingError> {
    let Some(payment_id) = user.payment_id.as_deref() else {
        return Ok(None);
    };
    if Subscription::find_by_user(user.id, &deps.db_pool).await?.is_none() {
        return Ok(None);
    }

    let invoice = deps.gateway.upcoming_invoice(payment_id).await?;
    Ok(Some(invoice.into()))
}

pub async fn invoice_history(user: &User, deps: &ServerDeps) -> Result<InvoiceHistory, BillingError> {
    let invoices = Invoice::billing_history(user.id, &deps.db_pool).await?;
    let upcoming_invoice = upcoming_invoice(user, deps).await?;

    Ok(InvoiceHistory {
        invoices,
        upcoming_invoice,
    })
}
