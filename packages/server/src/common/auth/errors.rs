use thiserror::Error;

/// Authentication and authorization failures
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing or invalid access token.")]
    AuthenticationRequired,

    #[error("Admin required.")]
    AdminRequired,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("This account is not active. If you recently signed up for an account, check your email for a verification link.")]
    AccountInactive,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
