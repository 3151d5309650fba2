//! Billing domain actions

mod invoices;
mod subscriptions;
mod webhook;

pub use invoices::{invoice_history, upcoming_invoice, InvoiceHistory};
pub use subscriptions::{
    billing_info, cancel_subscription, change_plan, create_subscription, update_payment_method,
    BillingInfo, SubscriptionInput,
};
pub use webhook::{handle_webhook_event, WebhookOutcome, INVOICE_CREATED};
