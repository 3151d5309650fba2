// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Domains decide what to charge, cancel or send; implementations only talk to
// the outside world.
//
// Naming convention: Base* for trait names (e.g., BasePaymentGateway, BaseMailer)

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Payment gateway
// =============================================================================

/// Gateway failures, already classified for the HTTP layer.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    CardDeclined(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("payment gateway authentication failed")]
    Authentication,

    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    #[error("payment gateway error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Message safe to show to the customer.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::CardDeclined(message) | GatewayError::InvalidRequest(message) => {
                message.clone()
            }
            GatewayError::Authentication => {
                "Authentication with our payment gateway failed.".to_string()
            }
            GatewayError::Unavailable(_) => {
                "Our payment gateway is having communication troubles. Please try again."
                    .to_string()
            }
            GatewayError::Other(_) => {
                "Our payment gateway is having issues, please try again.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    pub token: String,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCard {
    pub brand: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCustomer {
    pub id: String,
    pub card: Option<GatewayCard>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPlan {
    pub id: String,
    pub name: Option<String>,
    pub statement_descriptor: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayInvoice {
    /// Unix timestamp of the billing date.
    pub date: Option<i64>,
    pub amount_due: i64,
    pub plan: Option<GatewayPlan>,
}

/// An event as reported by the gateway itself.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub id: String,
    pub event_type: String,
    pub object: serde_json::Value,
}

#[async_trait]
pub trait BasePaymentGateway: Send + Sync {
    /// Create a customer with a card token, subscribed to `plan`.
    async fn create_customer(&self, customer: NewCustomer) -> Result<GatewayCustomer, GatewayError>;

    /// Replace the customer's default card, returning the new card.
    async fn update_card(&self, customer_id: &str, token: &str) -> Result<GatewayCard, GatewayError>;

    async fn change_plan(&self, customer_id: &str, plan_id: &str) -> Result<(), GatewayError>;

    async fn cancel_subscription(&self, customer_id: &str) -> Result<(), GatewayError>;

    async fn upcoming_invoice(&self, customer_id: &str) -> Result<GatewayInvoice, GatewayError>;

    async fn retrieve_event(&self, event_id: &str) -> Result<GatewayEvent, GatewayError>;
}

// =============================================================================
// Mail
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait BaseMailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<()>;
}
