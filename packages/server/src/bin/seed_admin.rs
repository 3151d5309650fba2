// Seed the initial admin account from configuration
//
// Safe to run repeatedly: nothing is written when the email or username is
// already taken.

use anyhow::{Context, Result};
use saas_core::common::Role;
use saas_core::domains::user::models::{CreateUser, User};
use saas_core::domains::user::password::hash_password;
use saas_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,saas_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    if User::find_by_email(&config.seed_admin_email, &pool)
        .await?
        .is_some()
        || User::find_by_username(&config.seed_admin_username, &pool)
            .await?
            .is_some()
    {
        tracing::info!(
            email = %config.seed_admin_email,
            "Admin account already exists, nothing to seed"
        );
        return Ok(());
    }

    let admin = User::create(
        CreateUser {
            username: config.seed_admin_username.clone(),
            email: config.seed_admin_email.clone(),
            password_hash: hash_password(&config.seed_admin_password)?,
            role: Role::Admin,
            is_active: true,
        },
        &pool,
    )
    .await
    .context("Failed to create admin account")?;

    tracing::info!(user_id = %admin.id, username = %admin.username, "Seeded admin account");
    Ok(())
}
