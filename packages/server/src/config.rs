use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub secret_key: String,
    pub jwt_issuer: String,
    pub jwt_cookie_secure: bool,
    pub access_token_ttl_days: i64,
    pub allowed_origins: Vec<String>,
    pub stripe_secret_key: String,
    pub stripe_api_version: String,
    pub mail_default_sender: String,
    pub app_base_url: String,
    pub seed_admin_email: String,
    pub seed_admin_username: String,
    pub seed_admin_password: String,
    pub run_job_runner: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            secret_key: env::var("SECRET_KEY").context("SECRET_KEY must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "saas-api".to_string()),
            jwt_cookie_secure: parse_bool("JWT_COOKIE_SECURE", false)?,
            access_token_ttl_days: env::var("ACCESS_TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "364".to_string())
                .parse()
                .context("ACCESS_TOKEN_TTL_DAYS must be a number of days")?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .context("STRIPE_SECRET_KEY must be set")?,
            stripe_api_version: env::var("STRIPE_API_VERSION")
                .unwrap_or_else(|_| "2018-02-28".to_string()),
            mail_default_sender: env::var("MAIL_DEFAULT_SENDER")
                .unwrap_or_else(|_| "contact@local.host".to_string()),
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            seed_admin_email: env::var("SEED_ADMIN_EMAIL")
                .unwrap_or_else(|_| "dev@local.host".to_string()),
            seed_admin_username: env::var("SEED_ADMIN_USERNAME")
                .unwrap_or_else(|_| "dev".to_string()),
            seed_admin_password: env::var("SEED_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "devpassword".to_string()),
            run_job_runner: parse_bool("RUN_JOB_RUNNER", true)?,
        })
    }
}

fn parse_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{} must be a boolean, got {:?}", key, other),
        },
        Err(_) => Ok(default),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
