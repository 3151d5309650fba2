// TestDependencies - mock implementations for testing
//
// Provides recording doubles that can be injected into ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::jobs::PostgresJobQueue;
use super::{
    BaseMailer, BasePaymentGateway, GatewayCard, GatewayCustomer, GatewayError, GatewayEvent,
    GatewayInvoice, GatewayPlan, MailMessage, NewCustomer, ServerDeps,
};
use crate::domains::auth::JwtService;
use crate::domains::billing::PlanCatalog;

pub const TEST_SECRET: &str = "test-secret-key";
pub const TEST_ISSUER: &str = "saas-api-test";

// =============================================================================
// Mock Payment Gateway
// =============================================================================

/// A call received by the mock gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateCustomer { email: String, plan: String },
    UpdateCard { customer_id: String },
    ChangePlan { customer_id: String, plan_id: String },
    CancelSubscription { customer_id: String },
    UpcomingInvoice { customer_id: String },
    RetrieveEvent { event_id: String },
}

pub struct MockPaymentGateway {
    calls: Arc<Mutex<Vec<GatewayCall>>>,
    events: Arc<Mutex<HashMap<String, GatewayEvent>>>,
    failing_customers: Arc<Mutex<HashSet<String>>>,
    decline_cards: bool,
    card: GatewayCard,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            events: Arc::new(Mutex::new(HashMap::new())),
            failing_customers: Arc::new(Mutex::new(HashSet::new())),
            decline_cards: false,
            card: GatewayCard {
                brand: "Visa".to_string(),
                last4: "4242".to_string(),
                exp_month: 12,
                exp_year: 2099,
            },
        }
    }

    /// Every card operation fails as a declined card
    pub fn declining_cards(mut self) -> Self {
        self.decline_cards = true;
        self
    }

    /// Card returned by create/update calls
    pub fn with_card(mut self, card: GatewayCard) -> Self {
        self.card = card;
        self
    }

    /// Make the gateway know about an event
    pub fn with_event(self, event: GatewayEvent) -> Self {
        self.add_event(event);
        self
    }

    pub fn add_event(&self, event: GatewayEvent) {
        self.events.lock().unwrap().insert(event.id.clone(), event);
    }

    /// Subscription cancellation for this customer fails
    pub fn fail_cancellation_for(&self, customer_id: &str) {
        self.failing_customers
            .lock()
            .unwrap()
            .insert(customer_id.to_string());
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cancelled_customers(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::CancelSubscription { customer_id } => Some(customer_id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn declined() -> GatewayError {
        GatewayError::CardDeclined("Your card was declined.".to_string())
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePaymentGateway for MockPaymentGateway {
    async fn create_customer(&self, customer: NewCustomer) -> Result<GatewayCustomer, GatewayError> {
        self.record(GatewayCall::CreateCustomer {
            email: customer.email,
            plan: customer.plan,
        });
        if self.decline_cards {
            return Err(Self::declined());
        }
        Ok(GatewayCustomer {
            id: format!("cus_{}", Uuid::new_v4().simple()),
            card: Some(self.card.clone()),
        })
    }

    async fn update_card(&self, customer_id: &str, _token: &str) -> Result<GatewayCard, GatewayError> {
        self.record(GatewayCall::UpdateCard {
            customer_id: customer_id.to_string(),
        });
        if self.decline_cards {
            return Err(Self::declined());
        }
        Ok(self.card.clone())
    }

    async fn change_plan(&self, customer_id: &str, plan_id: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::ChangePlan {
            customer_id: customer_id.to_string(),
            plan_id: plan_id.to_string(),
        });
        Ok(())
    }

    async fn cancel_subscription(&self, customer_id: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::CancelSubscription {
            customer_id: customer_id.to_string(),
        });
        if self.failing_customers.lock().unwrap().contains(customer_id) {
            return Err(GatewayError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }

    async fn upcoming_invoice(&self, customer_id: &str) -> Result<GatewayInvoice, GatewayError> {
        self.record(GatewayCall::UpcomingInvoice {
            customer_id: customer_id.to_string(),
        });
        Ok(GatewayInvoice {
            date: Some(1_434_371_855),
            amount_due: 999,
            plan: Some(GatewayPlan {
                id: "gold".to_string(),
                name: Some("Gold".to_string()),
                statement_descriptor: Some("SAAS GOLD".to_string()),
                interval: Some("month".to_string()),
            }),
        })
    }

    async fn retrieve_event(&self, event_id: &str) -> Result<GatewayEvent, GatewayError> {
        self.record(GatewayCall::RetrieveEvent {
            event_id: event_id.to_string(),
        });
        self.events
            .lock()
            .unwrap()
            .get(event_id)
            .cloned()
            .ok_or_else(|| GatewayError::InvalidRequest(format!("No such event: {}", event_id)))
    }
}

// =============================================================================
// Mock Mailer
// =============================================================================

#[derive(Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<MailMessage> {
        self.sent()
            .into_iter()
            .filter(|message| message.to == address)
            .collect()
    }
}

#[async_trait]
impl BaseMailer for MockMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock services plus handles to inspect them after the fact
#[derive(Clone)]
pub struct TestDependencies {
    pub gateway: Arc<MockPaymentGateway>,
    pub mailer: Arc<MockMailer>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self::with_gateway(MockPaymentGateway::new())
    }

    pub fn with_gateway(gateway: MockPaymentGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            mailer: Arc::new(MockMailer::new()),
        }
    }

    /// Build ServerDeps backed by the given database and these mocks
    pub fn into_server_deps(self, db_pool: PgPool) -> ServerDeps {
        ServerDeps::new(
            db_pool.clone(),
            self.gateway,
            self.mailer,
            Arc::new(JwtService::new(TEST_SECRET, TEST_ISSUER.to_string(), 1)),
            Arc::new(PostgresJobQueue::new(db_pool)),
            Arc::new(PlanCatalog::standard()),
            "http://localhost:8000".to_string(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
