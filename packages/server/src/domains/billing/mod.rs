//! Billing domain - plans, gateway-backed subscriptions and invoices
//!
//! Responsibilities:
//! - Subscribe, change plan, update card and cancel through the payment gateway
//! - Billing history and the gateway's upcoming invoice
//! - Invoice webhook ingestion
//! - Daily card-expiry sweep

pub mod actions;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod plans;

pub use errors::BillingError;
pub use plans::{Plan, PlanCatalog};
