use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stripe paginated list envelope.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Plan {
    pub id: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub interval_count: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub statement_descriptor: Option<String>,
    #[serde(default)]
    pub trial_period_days: Option<i64>,
    #[serde(default)]
    pub product: Option<Value>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Plan {
    /// Display name; newer API versions moved `name` to `nickname`.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.nickname.as_deref())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub statement_descriptor: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<u32>,
    #[serde(default)]
    pub exp_year: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub default_source: Option<String>,
    #[serde(default)]
    pub sources: List<Card>,
    #[serde(default)]
    pub subscriptions: List<Subscription>,
}

impl Customer {
    /// The card backing the default source, falling back to the first on file.
    pub fn default_card(&self) -> Option<&Card> {
        let by_default = self
            .default_source
            .as_deref()
            .and_then(|id| self.sources.data.iter().find(|card| card.id == id));
        by_default.or_else(|| self.sources.data.first())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan: Option<Plan>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Period {
    pub start: i64,
    pub end: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InvoiceLineItem {
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub period: Option<Period>,
    #[serde(default)]
    pub plan: Option<Plan>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Invoice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub date: Option<i64>,
    #[serde(default)]
    pub amount_due: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default)]
    pub lines: List<InvoiceLineItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EventData {
    pub object: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Deleted {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// Error body returned by Stripe on non-2xx responses.
#[derive(Deserialize, Debug, Clone)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorBody {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Parameters for creating a plan together with its product.
#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub id: String,
    /// Existing product to attach; a product is created inline when absent.
    pub product_id: Option<String>,
    pub name: String,
    pub amount: i64,
    pub currency: String,
    pub interval: String,
    pub interval_count: i64,
    pub trial_period_days: Option<i64>,
    pub statement_descriptor: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub name: String,
    pub statement_descriptor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub nickname: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateCustomer {
    pub email: String,
    pub source: String,
    pub plan: Option<String>,
    pub coupon: Option<String>,
}
