//! User domain actions - business logic functions
//!
//! Actions are async functions called directly from HTTP routes and jobs.

mod register;
mod verify_email;

pub use register::{register, RegistrationInput};
pub use verify_email::{resend_verification, verify_email};
