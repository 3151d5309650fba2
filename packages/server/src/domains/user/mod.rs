//! User domain - registration, email verification and password hashing.

pub mod actions;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod password;

pub use errors::UserError;
pub use models::User;
