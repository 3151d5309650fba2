//! Admin domain - dashboard counts and user management for admins.

pub mod actions;
pub mod errors;
pub mod jobs;
pub mod views;

pub use errors::AdminError;
