//! Domain service for password management.
//!
//! Change (authenticated), reset request (email lookup), and token-gated
//! set-password.

use thiserror::Error;

use crate::services::token_service::TokenError;

/// Errors specific to credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("User with this email not found")]
    UserNotFound,

    #[error(transparent)]
    InvalidToken(#[from] TokenError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CredentialError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for password flows.
#[async_trait::async_trait]
pub trait CredentialService: Send + Sync {
    /// Changes a user's password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Validation`] if the current password is
    /// incorrect or the new password is unusable.
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), CredentialError>;

    /// Looks up the account by email and dispatches a reset-purpose token.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::UserNotFound`] for unknown addresses;
    /// this endpoint deliberately discloses existence.
    async fn request_reset(&self, email: &str) -> Result<(), CredentialError>;

    /// Sets a new password authorized solely by a reset token. No current
    /// password is required; the token is the authorization.
    async fn set_password(&self, token: &str, new_password: &str) -> Result<(), CredentialError>;
}
