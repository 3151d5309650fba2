//! Subscription lifecycle actions

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use tracing::{error, info};

use crate::common::{UserId, ValidationErrors, Validator};
use crate::domains::billing::errors::BillingError;
use crate::domains::billing::models::{CardDetails, CreditCard, Subscription};
use crate::domains::billing::plans::Plan;
use crate::domains::user::models::User;
use crate::kernel::{GatewayCustomer, NewCustomer, ServerDeps};

/// Body of subscription and plan change requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionInput {
    #[serde(default)]
    pub stripe_token: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

impl SubscriptionInput {
    /// Validate the named fields, each required and 1..=255 characters.
    fn require<const N: usize>(
        &self,
        fields: [&'static str; N],
    ) -> Result<[String; N], ValidationErrors> {
        let mut v = Validator::new();
        let values = fields.map(|field| {
            let raw = match field {
                "stripe_token" => self.stripe_token.as_deref(),
                "plan" => self.plan.as_deref(),
                _ => self.customer_name.as_deref(),
            };
            let value = v.required(field, raw).map(str::trim).unwrap_or_default();
            if !value.is_empty() {
                v.length(field, value, 1, 255);
            }
            value.to_string()
        });
        v.finish()?;
        Ok(values)
    }
}

/// Card on file plus the plan the user pays for.
#[derive(Debug, Clone, Serialize)]
pub struct BillingInfo {
    pub credit_card: CreditCard,
    pub active_plan: Option<Plan>,
}

/// Subscribe a user: create the gateway customer, then record the
/// subscription and card locally in one transaction.
///
/// The user's row stays locked from the "already subscribed" check until
/// the local commit, so concurrent requests cannot both reach the gateway.
/// If the local write fails the new gateway subscription is cancelled.
pub async fn create_subscription(
    user: &User,
    input: SubscriptionInput,
    deps: &ServerDeps,
) -> Result<Subscription, BillingError> {
    let mut tx = deps.db_pool.begin().await?;
    User::lock_for_update(user.id, &mut *tx).await?;
    if Subscription::find_by_user(user.id, &mut *tx).await?.is_some() {
        return Err(BillingError::AlreadySubscribed);
    }

    let [token, plan_id, customer_name] = input.require(["stripe_token", "plan", "customer_name"])?;
    let plan = deps.plans.get(&plan_id).ok_or(BillingError::PlanNotFound)?;

    let customer = deps
        .gateway
        .create_customer(NewCustomer {
            email: user.email.clone(),
            token,
            plan: plan.id.clone(),
        })
        .await?;

    let recorded = record_subscription(tx, user.id, &customer, &customer_name, &plan.id).await;
    let subscription = match recorded {
        Ok(subscription) => subscription,
        Err(e) => {
            if let Err(cancel_error) = deps.gateway.cancel_subscription(&customer.id).await {
                error!(
                    user_id = %user.id,
                    payment_id = %customer.id,
                    error = %cancel_error,
                    "failed to cancel gateway subscription after local write failed"
                );
            }
            return Err(e);
        }
    };

    info!(user_id = %user.id, plan = %plan.id, payment_id = %customer.id, "subscription created");
    Ok(subscription)
}

async fn record_subscription(
    mut tx: Transaction<'_, Postgres>,
    user_id: UserId,
    customer: &GatewayCustomer,
    customer_name: &str,
    plan_id: &str,
) -> Result<Subscription, BillingError> {
    User::set_payment_details(user_id, &customer.id, customer_name, &mut *tx).await?;
    let subscription = Subscription::create(user_id, plan_id, &mut *tx).await?;
    if let Some(card) = &customer.card {
        let details = CardDetails::from_gateway(card, Utc::now().date_naive())?;
        CreditCard::upsert(user_id, &details, &mut *tx).await?;
    }
    tx.commit().await?;
    Ok(subscription)
}

/// Replace the card on file without touching the subscription.
pub async fn update_payment_method(
    user: &User,
    input: SubscriptionInput,
    deps: &ServerDeps,
) -> Result<CreditCard, BillingError> {
    if CreditCard::find_by_user(user.id, &deps.db_pool).await?.is_none() {
        return Err(BillingError::NoPaymentMethod);
    }
    let payment_id = user
        .payment_id
        .as_deref()
        .ok_or(BillingError::NoPaymentMethod)?;

    let [token, customer_name] = input.require(["stripe_token", "customer_name"])?;

    let card = deps.gateway.update_card(payment_id, &token).await?;
    let details = CardDetails::from_gateway(&card, Utc::now().date_naive())?;

    let mut tx = deps.db_pool.begin().await?;
    User::set_name(user.id, &customer_name, &mut *tx).await?;
    let card = CreditCard::upsert(user.id, &details, &mut *tx).await?;
    tx.commit().await?;

    info!(user_id = %user.id, "payment method updated");
    Ok(card)
}

pub async fn billing_info(user: &User, deps: &ServerDeps) -> Result<BillingInfo, BillingError> {
    let credit_card = CreditCard::find_by_user(user.id, &deps.db_pool)
        .await?
        .ok_or(BillingError::NoCreditCard)?;
    let active_plan = Subscription::find_by_user(user.id, &deps.db_pool)
        .await?
        .and_then(|s| deps.plans.get(&s.plan).cloned());

    Ok(BillingInfo {
        credit_card,
        active_plan,
    })
}

/// Cancel at the gateway, then drop the local subscription and card.
pub async fn cancel_subscription(user: &User, deps: &ServerDeps) -> Result<(), BillingError> {
    let subscription = Subscription::find_by_user(user.id, &deps.db_pool).await?;
    let (Some(_), Some(payment_id)) = (subscription, user.payment_id.as_deref()) else {
        return Err(BillingError::SubscriptionRequired);
    };

    deps.gateway.cancel_subscription(payment_id).await?;

    let mut tx = deps.db_pool.begin().await?;
    Subscription::delete_for_user(user.id, &mut *tx).await?;
    CreditCard::delete_for_user(user.id, &mut *tx).await?;
    User::mark_subscription_cancelled(user.id, &mut *tx).await?;
    tx.commit().await?;

    info!(user_id = %user.id, payment_id = %payment_id, "subscription cancelled");
    Ok(())
}

/// Move an active subscription to another plan.
pub async fn change_plan(
    user: &User,
    input: SubscriptionInput,
    deps: &ServerDeps,
) -> Result<Subscription, BillingError> {
    let subscription = Subscription::find_by_user(user.id, &deps.db_pool).await?;
    let (Some(current), Some(payment_id)) = (subscription, user.payment_id.as_deref()) else {
        return Err(BillingError::SubscriptionRequired);
    };

    let [plan_id] = input.require(["plan"])?;
    let plan = deps.plans.get(&plan_id).ok_or(BillingError::PlanNotFound)?;
    if plan.id == current.plan {
        return Err(BillingError::SamePlan);
    }

    deps.gateway.change_plan(payment_id, &plan.id).await?;
    let subscription = Subscription::update_plan(user.id, &plan.id, &deps.db_pool).await?;

    info!(user_id = %user.id, from = %current.plan, to = %plan.id, "plan changed");
    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_requested_fields_are_required() {
        let input = SubscriptionInput {
            plan: Some("gold".into()),
            ..Default::default()
        };
        assert_eq!(input.require(["plan"]).unwrap(), ["gold".to_string()]);

        let errors = input.require(["stripe_token", "customer_name"]).unwrap_err();
        assert!(errors.has("stripe_token"));
        assert!(errors.has("customer_name"));
        assert!(!errors.has("plan"));
    }

    #[test]
    fn overlong_values_are_rejected() {
        let input = SubscriptionInput {
            plan: Some("x".repeat(256)),
            ..Default::default()
        };
        let errors = input.require(["plan"]).unwrap_err();
        assert_eq!(
            errors.get("plan"),
            Some(&["Length must be between 1 and 255.".to_string()][..])
        );
    }
}
