//! Server dependencies for domain actions and jobs (using traits for testability)
//!
//! All external services sit behind trait objects so tests can swap in the
//! recording doubles from `test_dependencies`.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use stripe::models::{Card, CreateCustomer};
use stripe::{StripeError, StripeService};

use crate::domains::auth::JwtService;
use crate::domains::billing::PlanCatalog;
use crate::kernel::jobs::JobQueue;
use crate::kernel::{
    BaseMailer, BasePaymentGateway, GatewayCard, GatewayCustomer, GatewayError, GatewayEvent,
    GatewayInvoice, GatewayPlan, NewCustomer,
};

// =============================================================================
// StripeService Adapter (implements BasePaymentGateway trait)
// =============================================================================

/// Wrapper around StripeService that implements BasePaymentGateway trait
pub struct StripeAdapter(pub Arc<StripeService>);

impl StripeAdapter {
    pub fn new(service: Arc<StripeService>) -> Self {
        Self(service)
    }
}

impl From<StripeError> for GatewayError {
    fn from(error: StripeError) -> Self {
        match error {
            StripeError::Card(message) => GatewayError::CardDeclined(message),
            StripeError::InvalidRequest(message) => GatewayError::InvalidRequest(message),
            StripeError::Authentication(_) => GatewayError::Authentication,
            StripeError::RateLimit(message) | StripeError::Connection(message) => {
                GatewayError::Unavailable(message)
            }
            other => GatewayError::Other(other.to_string()),
        }
    }
}

fn gateway_card(card: &Card) -> Option<GatewayCard> {
    Some(GatewayCard {
        brand: card.brand.clone()?,
        last4: card.last4.clone()?,
        exp_month: card.exp_month?,
        exp_year: card.exp_year?,
    })
}

#[async_trait]
impl BasePaymentGateway for StripeAdapter {
    async fn create_customer(&self, customer: NewCustomer) -> Result<GatewayCustomer, GatewayError> {
        let created = self
            .0
            .create_customer(&CreateCustomer {
                email: customer.email,
                source: customer.token,
                plan: Some(customer.plan),
                coupon: None,
            })
            .await?;

        Ok(GatewayCustomer {
            card: created.default_card().and_then(gateway_card),
            id: created.id,
        })
    }

    async fn update_card(&self, customer_id: &str, token: &str) -> Result<GatewayCard, GatewayError> {
        let customer = self.0.update_customer_source(customer_id, token).await?;
        customer
            .default_card()
            .and_then(gateway_card)
            .ok_or_else(|| GatewayError::InvalidRequest("No card was attached to the customer.".into()))
    }

    async fn change_plan(&self, customer_id: &str, plan_id: &str) -> Result<(), GatewayError> {
        self.0.update_subscription_plan(customer_id, plan_id).await?;
        Ok(())
    }

    async fn cancel_subscription(&self, customer_id: &str) -> Result<(), GatewayError> {
        self.0.cancel_subscription(customer_id).await?;
        Ok(())
    }

    async fn upcoming_invoice(&self, customer_id: &str) -> Result<GatewayInvoice, GatewayError> {
        let invoice = self.0.upcoming_invoice(customer_id).await?;
        let plan = invoice
            .lines
            .data
            .first()
            .and_then(|line| line.plan.as_ref())
            .map(|plan| GatewayPlan {
                id: plan.id.clone(),
                name: plan.display_name().map(String::from),
                statement_descriptor: plan.statement_descriptor.clone(),
                interval: plan.interval.clone(),
            });

        Ok(GatewayInvoice {
            date: invoice.date,
            amount_due: invoice.amount_due.unwrap_or(0),
            plan,
        })
    }

    async fn retrieve_event(&self, event_id: &str) -> Result<GatewayEvent, GatewayError> {
        let event = self.0.retrieve_event(event_id).await?;
        Ok(GatewayEvent {
            id: event.id,
            event_type: event.event_type,
            object: event.data.object,
        })
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to actions and jobs (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub gateway: Arc<dyn BasePaymentGateway>,
    pub mailer: Arc<dyn BaseMailer>,
    pub jwt_service: Arc<JwtService>,
    pub job_queue: Arc<dyn JobQueue>,
    pub plans: Arc<PlanCatalog>,
    /// Base URL used when building links in outgoing mail
    pub app_base_url: String,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        gateway: Arc<dyn BasePaymentGateway>,
        mailer: Arc<dyn BaseMailer>,
        jwt_service: Arc<JwtService>,
        job_queue: Arc<dyn JobQueue>,
        plans: Arc<PlanCatalog>,
        app_base_url: String,
    ) -> Self {
        Self {
            db_pool,
            gateway,
            mailer,
            jwt_service,
            job_queue,
            plans,
            app_base_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_errors_map_to_gateway_errors() {
        assert!(matches!(
            GatewayError::from(StripeError::Card("declined".into())),
            GatewayError::CardDeclined(m) if m == "declined"
        ));
        assert!(matches!(
            GatewayError::from(StripeError::Connection("timeout".into())),
            GatewayError::Unavailable(_)
        ));
        assert!(matches!(
            GatewayError::from(StripeError::Decode("bad json".into())),
            GatewayError::Other(_)
        ));
    }

    #[test]
    fn incomplete_cards_are_dropped() {
        let card = Card {
            id: "card_1".into(),
            brand: Some("Visa".into()),
            last4: None,
            exp_month: Some(1),
            exp_year: Some(2030),
        };
        assert!(gateway_card(&card).is_none());
    }
}
