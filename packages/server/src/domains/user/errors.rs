use thiserror::Error;

use crate::common::ValidationErrors;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Invalid input.")]
    InvalidInput,

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Verification token is invalid or expired.")]
    InvalidVerificationToken,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
