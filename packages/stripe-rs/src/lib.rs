//! Minimal Stripe REST client covering plans, customers, subscriptions,
//! invoices and events.

pub mod models;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    CreateCustomer, CreatePlan, CreateProduct, Customer, Deleted, ErrorEnvelope, Event, Invoice,
    List, Plan, Product, Subscription, UpdatePlan,
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("{0}")]
    Card(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("authentication with Stripe failed: {0}")]
    Authentication(String),
    #[error("rate limited by Stripe: {0}")]
    RateLimit(String),
    #[error("could not reach Stripe: {0}")]
    Connection(String),
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected Stripe response: {0}")]
    Decode(String),
}

impl StripeError {
    /// Map an error body to the matching variant.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|e| e.error.message.clone())
            .unwrap_or_else(|| body.to_string());
        let kind = parsed.as_ref().and_then(|e| e.error.error_type.clone());

        match kind.as_deref() {
            Some("card_error") => StripeError::Card(message),
            Some("invalid_request_error") => StripeError::InvalidRequest(message),
            Some("authentication_error") => StripeError::Authentication(message),
            Some("rate_limit_error") => StripeError::RateLimit(message),
            Some("api_connection_error") => StripeError::Connection(message),
            _ if status == StatusCode::UNAUTHORIZED => StripeError::Authentication(message),
            _ if status == StatusCode::TOO_MANY_REQUESTS => StripeError::RateLimit(message),
            _ if status == StatusCode::NOT_FOUND => StripeError::InvalidRequest(message),
            _ => StripeError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct StripeOptions {
    pub secret_key: String,
    pub api_version: String,
    pub api_base: String,
}

impl StripeOptions {
    pub fn new(secret_key: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_version: api_version.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StripeService {
    options: StripeOptions,
    client: Client,
}

type Form = Vec<(String, String)>;

impl StripeService {
    pub fn new(options: StripeOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.options.api_base.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .bearer_auth(&self.options.secret_key)
            .header("Stripe-Version", &self.options.api_version)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, StripeError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StripeError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StripeError::Connection(e.to_string()))?;

        if !status.is_success() {
            warn!(status = %status, "Stripe returned an error");
            return Err(StripeError::from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| StripeError::Decode(e.to_string()))
    }

    // ========================================================================
    // Plans
    // ========================================================================

    /// Fetch a plan, returning `None` when Stripe does not know it.
    pub async fn retrieve_plan(&self, plan_id: &str) -> Result<Option<Plan>, StripeError> {
        let builder = self.request(Method::GET, &format!("plans/{}", plan_id));
        match self.send::<Plan>(builder).await {
            Ok(plan) => Ok(Some(plan)),
            Err(StripeError::InvalidRequest(message)) => {
                debug!(plan_id, %message, "plan lookup missed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_plans(&self) -> Result<List<Plan>, StripeError> {
        let builder = self
            .request(Method::GET, "plans")
            .query(&[("limit", "100")]);
        self.send(builder).await
    }

    /// Create a plan. Without a `product_id` the product is created inline.
    pub async fn create_plan(&self, params: &CreatePlan) -> Result<Plan, StripeError> {
        let builder = self
            .request(Method::POST, "plans")
            .form(&create_plan_form(params));
        self.send(builder).await
    }

    pub async fn update_plan(&self, plan_id: &str, params: &UpdatePlan) -> Result<Plan, StripeError> {
        let builder = self
            .request(Method::POST, &format!("plans/{}", plan_id))
            .form(&update_plan_form(params));
        self.send(builder).await
    }

    pub async fn delete_plan(&self, plan_id: &str) -> Result<Deleted, StripeError> {
        let builder = self.request(Method::DELETE, &format!("plans/{}", plan_id));
        self.send(builder).await
    }

    pub async fn create_product(&self, params: &CreateProduct) -> Result<Product, StripeError> {
        let mut form: Form = vec![
            ("name".into(), params.name.clone()),
            ("type".into(), "service".into()),
        ];
        if let Some(descriptor) = &params.statement_descriptor {
            form.push(("statement_descriptor".into(), descriptor.clone()));
        }
        let builder = self.request(Method::POST, "products").form(&form);
        self.send(builder).await
    }

    pub async fn retrieve_product(&self, product_id: &str) -> Result<Product, StripeError> {
        let builder = self.request(Method::GET, &format!("products/{}", product_id));
        self.send(builder).await
    }

    // ========================================================================
    // Customers and subscriptions
    // ========================================================================

    pub async fn create_customer(&self, params: &CreateCustomer) -> Result<Customer, StripeError> {
        let builder = self
            .request(Method::POST, "customers")
            .form(&create_customer_form(params));
        self.send(builder).await
    }

    pub async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, StripeError> {
        let builder = self
            .request(Method::GET, &format!("customers/{}", customer_id))
            .query(&[("expand[]", "sources")]);
        self.send(builder).await
    }

    /// Replace the customer's default payment source.
    pub async fn update_customer_source(
        &self,
        customer_id: &str,
        source: &str,
    ) -> Result<Customer, StripeError> {
        let form: Form = vec![("source".into(), source.into())];
        let builder = self
            .request(Method::POST, &format!("customers/{}", customer_id))
            .form(&form);
        self.send(builder).await
    }

    pub async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<List<Subscription>, StripeError> {
        let builder = self
            .request(Method::GET, "subscriptions")
            .query(&[("customer", customer_id), ("limit", "10")]);
        self.send(builder).await
    }

    async fn first_subscription(&self, customer_id: &str) -> Result<Subscription, StripeError> {
        self.list_subscriptions(customer_id)
            .await?
            .data
            .into_iter()
            .next()
            .ok_or_else(|| {
                StripeError::InvalidRequest(format!(
                    "Customer {} has no active subscriptions",
                    customer_id
                ))
            })
    }

    /// Move the customer's current subscription onto another plan.
    pub async fn update_subscription_plan(
        &self,
        customer_id: &str,
        plan_id: &str,
    ) -> Result<Subscription, StripeError> {
        let subscription = self.first_subscription(customer_id).await?;
        let form: Form = vec![("plan".into(), plan_id.into())];
        let builder = self
            .request(Method::POST, &format!("subscriptions/{}", subscription.id))
            .form(&form);
        self.send(builder).await
    }

    pub async fn cancel_subscription(&self, customer_id: &str) -> Result<Subscription, StripeError> {
        let subscription = self.first_subscription(customer_id).await?;
        let builder = self.request(Method::DELETE, &format!("subscriptions/{}", subscription.id));
        self.send(builder).await
    }

    // ========================================================================
    // Invoices and events
    // ========================================================================

    pub async fn upcoming_invoice(&self, customer_id: &str) -> Result<Invoice, StripeError> {
        let builder = self
            .request(Method::GET, "invoices/upcoming")
            .query(&[("customer", customer_id)]);
        self.send(builder).await
    }

    pub async fn retrieve_event(&self, event_id: &str) -> Result<Event, StripeError> {
        let builder = self.request(Method::GET, &format!("events/{}", event_id));
        self.send(builder).await
    }
}

fn push_metadata(form: &mut Form, metadata: &std::collections::HashMap<String, String>) {
    let mut keys: Vec<_> = metadata.keys().collect();
    keys.sort();
    for key in keys {
        form.push((format!("metadata[{}]", key), metadata[key].clone()));
    }
}

fn create_plan_form(params: &CreatePlan) -> Form {
    let mut form: Form = vec![
        ("id".into(), params.id.clone()),
        ("nickname".into(), params.name.clone()),
        ("amount".into(), params.amount.to_string()),
        ("currency".into(), params.currency.clone()),
        ("interval".into(), params.interval.clone()),
        ("interval_count".into(), params.interval_count.to_string()),
    ];
    match &params.product_id {
        Some(product_id) => form.push(("product".into(), product_id.clone())),
        None => {
            form.push(("product[name]".into(), params.name.clone()));
            if let Some(descriptor) = &params.statement_descriptor {
                form.push(("product[statement_descriptor]".into(), descriptor.clone()));
            }
        }
    }
    if let Some(days) = params.trial_period_days {
        form.push(("trial_period_days".into(), days.to_string()));
    }
    push_metadata(&mut form, &params.metadata);
    form
}

fn update_plan_form(params: &UpdatePlan) -> Form {
    let mut form: Form = vec![("nickname".into(), params.nickname.clone())];
    push_metadata(&mut form, &params.metadata);
    form
}

fn create_customer_form(params: &CreateCustomer) -> Form {
    let mut form: Form = vec![
        ("email".into(), params.email.clone()),
        ("source".into(), params.source.clone()),
    ];
    if let Some(plan) = &params.plan {
        form.push(("plan".into(), plan.clone()));
    }
    if let Some(coupon) = &params.coupon {
        form.push(("coupon".into(), coupon.clone()));
    }
    form
}
