// Common types and utilities shared across the application

pub mod auth;
pub mod entity_ids;
pub mod id;
pub mod pagination;
pub mod validation;

pub use auth::{AuthError, Role};
pub use entity_ids::*;
pub use id::Id;
pub use pagination::{Page, PageParams};
pub use validation::{ValidationErrors, Validator};
