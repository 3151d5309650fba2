//! Auth domain - credential sign-in and signed tokens
//!
//! Responsibilities:
//! - Identity (email or username) + password sign-in with activity tracking
//! - Access tokens carrying the role and a CSRF value for cookie clients
//! - Short-lived email verification tokens

pub mod actions;
pub mod jwt;

pub use jwt::{AccessToken, Claims, JwtService};
