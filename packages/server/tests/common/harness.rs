//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by the whole test binary. Migrations run
//! once into a template database; every test gets its own database cloned
//! from that template, so tests never see each other's rows.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use saas_core::kernel::jobs::JobRunner;
use saas_core::kernel::test_dependencies::{MockPaymentGateway, TestDependencies};
use saas_core::kernel::ServerDeps;
use saas_core::server::{build_app, build_job_registry, AppSettings};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::{Mutex, OnceCell};
use uuid::Uuid;

use super::TestClient;

const TEMPLATE_DB: &str = "saas_template";

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    host: String,
    port: u16,
    // CREATE DATABASE ... TEMPLATE must not race itself
    create_lock: Mutex<()>,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = postgres.get_host().await?.to_string();
        let port = postgres.get_host_port_ipv4(5432).await?;

        let infra = Self {
            host,
            port,
            create_lock: Mutex::new(()),
            _postgres: postgres,
        };

        let mut admin = infra.admin_connection().await?;
        admin
            .execute(format!("CREATE DATABASE {}", TEMPLATE_DB).as_str())
            .await
            .context("Failed to create template database")?;
        admin.close().await?;

        // Pools are tied to the runtime that made them, so this one is
        // closed before the template is ever cloned.
        let pool = PgPool::connect(&infra.url(TEMPLATE_DB))
            .await
            .context("Failed to connect to template database")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        pool.close().await;

        Ok(infra)
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }

    fn url(&self, database: &str) -> String {
        format!(
            "postgresql://postgres:postgres@{}:{}/{}",
            self.host, self.port, database
        )
    }

    async fn admin_connection(&self) -> Result<PgConnection> {
        PgConnection::connect(&self.url("postgres"))
            .await
            .context("Failed to connect to Postgres")
    }

    async fn create_database(&self) -> Result<String> {
        let name = format!("test_{}", Uuid::new_v4().simple());
        let _guard = self.create_lock.lock().await;

        let mut admin = self.admin_connection().await?;
        admin
            .execute(format!("CREATE DATABASE {} TEMPLATE {}", name, TEMPLATE_DB).as_str())
            .await
            .with_context(|| format!("Failed to create database {}", name))?;
        admin.close().await?;

        Ok(name)
    }

    async fn drop_database(&self, name: &str) -> Result<()> {
        let mut admin = self.admin_connection().await?;
        admin
            .execute(format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", name).as_str())
            .await?;
        admin.close().await?;
        Ok(())
    }
}

/// Per-test database, mocked outside services and the app wired to both.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let response = ctx.client().get("/health").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestHarness {
    pub db_pool: PgPool,
    pub deps: Arc<ServerDeps>,
    /// Handles to the mocks inside `deps`
    pub mocks: TestDependencies,
    database: String,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
        if let Err(e) = SharedTestInfra::get().await.drop_database(&self.database).await {
            tracing::warn!(database = %self.database, error = %e, "failed to drop test database");
        }
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_mocks(TestDependencies::new()).await
    }

    /// Harness whose gateway was configured up front (declines, events).
    pub async fn with_gateway(gateway: MockPaymentGateway) -> Result<Self> {
        Self::with_mocks(TestDependencies::with_gateway(gateway)).await
    }

    async fn with_mocks(mocks: TestDependencies) -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let database = infra.create_database().await?;

        let db_pool = PgPool::connect(&infra.url(&database))
            .await
            .context("Failed to connect to test database")?;

        let deps = Arc::new(mocks.clone().into_server_deps(db_pool.clone()));

        Ok(Self {
            db_pool,
            deps,
            mocks,
            database,
        })
    }

    pub fn app(&self) -> Router {
        build_app(self.deps.clone(), AppSettings::default())
    }

    /// HTTP client that calls the router in-process.
    pub fn client(&self) -> TestClient {
        TestClient::new(self.app(), SocketAddr::from(([127, 0, 0, 1], 40_000)))
    }

    /// Run queued jobs until the queue is empty. Returns how many ran.
    pub async fn run_jobs(&self) -> Result<usize> {
        let runner = JobRunner::new(
            self.deps.job_queue.clone(),
            Arc::new(build_job_registry()),
            self.deps.clone(),
        );

        let mut total = 0;
        loop {
            let processed = runner.run_once().await?;
            if processed == 0 {
                return Ok(total);
            }
            total += processed;
        }
    }
}
