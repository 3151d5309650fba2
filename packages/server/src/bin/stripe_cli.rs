//! CLI for mirroring the plan catalog to Stripe
//!
//! Only needs STRIPE_SECRET_KEY (and optionally STRIPE_API_VERSION).

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use saas_core::domains::billing::{Plan, PlanCatalog};
use stripe::models::{CreatePlan, UpdatePlan};
use stripe::{StripeOptions, StripeService};

#[derive(Parser)]
#[command(name = "stripe_cli")]
#[command(about = "Perform various tasks with Stripe's API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update every catalog plan on the Stripe account
    SyncPlans,

    /// Delete one or more plans from Stripe
    DeletePlans {
        #[arg(required = true)]
        plan_ids: Vec<String>,
    },

    /// List all existing plans on Stripe
    ListPlans,
}

fn plan_metadata(plan: &Plan) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    if plan.metadata.recommended {
        metadata.insert("recommended".to_string(), "true".to_string());
    }
    metadata
}

fn create_params(plan: &Plan) -> CreatePlan {
    CreatePlan {
        id: plan.id.clone(),
        product_id: None,
        name: plan.name.clone(),
        amount: plan.amount,
        currency: plan.currency.clone(),
        interval: plan.interval.clone(),
        interval_count: plan.interval_count.into(),
        trial_period_days: Some(plan.trial_period_days.into()),
        statement_descriptor: Some(plan.statement_descriptor.clone()),
        metadata: plan_metadata(plan),
    }
}

async fn sync_plans(stripe: &StripeService, catalog: &PlanCatalog) -> Result<()> {
    for plan in catalog.iter() {
        let existing = stripe
            .retrieve_plan(&plan.id)
            .await
            .with_context(|| format!("Failed to look up plan {}", plan.id))?;

        if existing.is_some() {
            stripe
                .update_plan(
                    &plan.id,
                    &UpdatePlan {
                        nickname: plan.name.clone(),
                        metadata: plan_metadata(plan),
                    },
                )
                .await
                .with_context(|| format!("Failed to update plan {}", plan.id))?;
            println!("updated {}", plan.id);
        } else {
            stripe
                .create_plan(&create_params(plan))
                .await
                .with_context(|| format!("Failed to create plan {}", plan.id))?;
            println!("created {}", plan.id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = dotenv();
    let secret_key = env::var("STRIPE_SECRET_KEY").context("STRIPE_SECRET_KEY must be set")?;
    let api_version =
        env::var("STRIPE_API_VERSION").unwrap_or_else(|_| "2018-02-28".to_string());
    let stripe = StripeService::new(StripeOptions::new(secret_key, api_version));

    match cli.command {
        Commands::SyncPlans => sync_plans(&stripe, &PlanCatalog::standard()).await?,
        Commands::DeletePlans { plan_ids } => {
            for plan_id in plan_ids {
                stripe
                    .delete_plan(&plan_id)
                    .await
                    .with_context(|| format!("Failed to delete plan {}", plan_id))?;
                println!("deleted {}", plan_id);
            }
        }
        Commands::ListPlans => {
            let plans = stripe.list_plans().await.context("Failed to list plans")?;
            for plan in plans.data {
                println!(
                    "{}\t{}\t{} {:?}/{:?}",
                    plan.id,
                    plan.display_name().unwrap_or("-"),
                    plan.amount.unwrap_or_default(),
                    plan.currency,
                    plan.interval
                );
            }
        }
    }

    Ok(())
}
