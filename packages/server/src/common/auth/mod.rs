// Authentication primitives shared by domains and the HTTP layer.

mod errors;
mod role;

pub use errors::AuthError;
pub use role::Role;
