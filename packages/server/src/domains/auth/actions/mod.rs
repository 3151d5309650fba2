//! Auth domain actions

mod authenticate;

pub use authenticate::{authenticate, AuthenticateResult, Credentials};
