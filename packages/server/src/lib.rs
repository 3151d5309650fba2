// SaaS API - Core
//
// Accounts, admin user management and Stripe-backed subscription billing,
// served as a JSON API. Business logic lives in domains/*/actions; jobs
// re-enter the same actions through the Postgres-backed queue in kernel/jobs.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
