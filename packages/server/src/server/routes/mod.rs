// HTTP routes
pub mod admin;
pub mod auth;
pub mod billing;
pub mod health;
pub mod users;
pub mod webhook;

pub use health::*;
