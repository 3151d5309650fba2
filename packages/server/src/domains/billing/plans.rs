//! Compiled-in plan catalog mirrored to the payment gateway by `stripe_cli sync-plans`.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanMetadata {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recommended: bool,
}

/// A billing tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    /// Price in the currency's smallest unit
    pub amount: i64,
    pub currency: String,
    pub interval: String,
    pub interval_count: u32,
    pub trial_period_days: u32,
    pub statement_descriptor: String,
    pub metadata: PlanMetadata,
}

impl Plan {
    fn monthly(id: &str, name: &str, amount: i64, recommended: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            amount,
            currency: "usd".to_string(),
            interval: "month".to_string(),
            interval_count: 1,
            trial_period_days: 14,
            statement_descriptor: format!("SAAS {}", name.to_uppercase()),
            metadata: PlanMetadata { recommended },
        }
    }
}

/// Plans keyed by id
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    plans: BTreeMap<String, Plan>,
}

impl PlanCatalog {
    pub fn new(plans: impl IntoIterator<Item = Plan>) -> Self {
        Self {
            plans: plans.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Bronze, gold (recommended) and platinum monthly plans.
    pub fn standard() -> Self {
        Self::new([
            Plan::monthly("bronze", "Bronze", 499, false),
            Plan::monthly("gold", "Gold", 999, true),
            Plan::monthly("platinum", "Platinum", 1299, false),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Plan> {
        self.plans.get(id)
    }

    pub fn all(&self) -> &BTreeMap<String, Plan> {
        &self.plans
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plan> {
        self.plans.values()
    }
}
