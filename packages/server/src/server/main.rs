// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use saas_core::domains::auth::JwtService;
use saas_core::domains::billing::PlanCatalog;
use saas_core::kernel::jobs::PostgresJobQueue;
use saas_core::kernel::{start_scheduler, LogMailer, ServerDeps, StripeAdapter};
use saas_core::server::{build_app, spawn_job_runner, AppSettings};
use saas_core::Config;
use sqlx::postgres::PgPoolOptions;
use stripe::{StripeOptions, StripeService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,saas_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SaaS API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let stripe = Arc::new(StripeService::new(StripeOptions::new(
        config.stripe_secret_key.clone(),
        config.stripe_api_version.clone(),
    )));

    let job_queue = Arc::new(PostgresJobQueue::new(pool.clone()));

    let deps = Arc::new(ServerDeps::new(
        pool,
        Arc::new(StripeAdapter::new(stripe)),
        Arc::new(LogMailer::new(config.mail_default_sender.clone())),
        Arc::new(JwtService::new(
            &config.secret_key,
            config.jwt_issuer.clone(),
            config.access_token_ttl_days,
        )),
        job_queue.clone(),
        Arc::new(PlanCatalog::standard()),
        config.app_base_url.clone(),
    ));

    if config.run_job_runner {
        spawn_job_runner(deps.clone());
        tracing::info!("Job runner started");
    }

    let _scheduler = start_scheduler(job_queue)
        .await
        .context("Failed to start scheduled tasks")?;

    let app = build_app(
        deps,
        AppSettings {
            allowed_origins: config.allowed_origins.clone(),
            cookie_secure: config.jwt_cookie_secure,
        },
    );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
