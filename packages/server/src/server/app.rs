//! Application setup and server configuration.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::admin::jobs::{delete_users, DeleteUsersJob};
use crate::domains::billing::jobs::{mark_expiring_credit_cards, MarkExpiringCreditCardsJob};
use crate::domains::user::jobs::{deliver_verification_email, DeliverVerificationEmailJob};
use crate::kernel::jobs::{JobRegistry, JobRunner};
use crate::kernel::ServerDeps;
use crate::server::middleware::{extract_client_ip, jwt_auth_middleware, CSRF_HEADER};
use crate::server::routes::{admin, auth, billing, health_handler, users, webhook};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    /// Mark session cookies `Secure`
    pub cookie_secure: bool,
}

/// HTTP-only settings that do not belong in ServerDeps
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    /// Empty allows any origin (without credentials)
    pub allowed_origins: Vec<String>,
    pub cookie_secure: bool,
}

/// Register every background job the domains define.
pub fn build_job_registry() -> JobRegistry {
    let mut registry = JobRegistry::new();
    registry.register::<DeliverVerificationEmailJob, _, _>(
        DeliverVerificationEmailJob::JOB_TYPE,
        deliver_verification_email,
    );
    registry.register::<DeleteUsersJob, _, _>(DeleteUsersJob::JOB_TYPE, delete_users);
    registry.register::<MarkExpiringCreditCardsJob, _, _>(
        MarkExpiringCreditCardsJob::JOB_TYPE,
        mark_expiring_credit_cards,
    );
    registry
}

/// Spawn the job runner as a background task. Returns its shutdown flag.
pub fn spawn_job_runner(deps: Arc<ServerDeps>) -> Arc<AtomicBool> {
    let runner = JobRunner::new(
        deps.job_queue.clone(),
        Arc::new(build_job_registry()),
        deps,
    );
    let shutdown = runner.shutdown_handle();

    tokio::spawn(async move {
        if let Err(e) = runner.run().await {
            tracing::error!(error = %e, "Job runner exited with error");
        }
    });

    shutdown
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
        ]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>, settings: AppSettings) -> Router {
    let app_state = AppState {
        deps: deps.clone(),
        cookie_secure: settings.cookie_secure,
    };

    let jwt_service = deps.jwt_service.clone();

    // Sign-in: one attempt replenished every 6 seconds, bursts up to 10, per client IP
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_second(6)
            .burst_size(10)
            .use_headers()
            .finish()
            .expect("Rate limiter configuration is valid and should never fail"),
    );

    let auth_routes = Router::new()
        .route("/api/auth", post(auth::sign_in).delete(auth::sign_out))
        .layer(GovernorLayer {
            config: rate_limit_config,
        });

    let user_routes = Router::new()
        .route("/api/v1/users", post(users::register))
        .route("/api/v1/users/verify", post(users::verify))
        .route("/api/v1/users/verify/resend", post(users::resend_verification));

    let admin_routes = Router::new()
        .route("/api/v1/admin", get(admin::dashboard))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route("/api/v1/admin/users/bulk_delete", post(admin::bulk_delete))
        .route(
            "/api/v1/admin/users/:username",
            get(admin::show_user).put(admin::update_user),
        )
        .route(
            "/api/v1/admin/users/:username/subscription",
            delete(admin::cancel_subscription),
        );

    let billing_routes = Router::new()
        .route(
            "/api/v1/subscriptions",
            get(billing::billing_info)
                .post(billing::create_subscription)
                .put(billing::update_payment_method)
                .delete(billing::cancel_subscription),
        )
        .route(
            "/api/v1/plans",
            get(billing::list_plans).put(billing::change_plan),
        )
        .route("/api/v1/invoices", get(billing::invoices))
        .route("/api/stripe_webhook", post(webhook::stripe_webhook));

    Router::new()
        .merge(auth_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .merge(billing_routes)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(middleware::from_fn(extract_client_ip))
        .layer(Extension(app_state))
        .layer(cors_layer(&settings.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
