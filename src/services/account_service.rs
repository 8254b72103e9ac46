//! Domain service for the account lifecycle.
//!
//! Covers registration, email verification, the email-change deactivation
//! side effect, account deletion, and the admin listing.

use thiserror::Error;

use crate::db::{AccountChanges, NewAccount, User, UserListQuery};
use crate::entities::profiles;
use crate::services::token_service::TokenError;

/// Errors specific to account lifecycle operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User not found")]
    UserNotFound,

    #[error("This account is already active")]
    AlreadyActive,

    #[error(transparent)]
    InvalidToken(#[from] TokenError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for the account lifecycle.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an inactive account and dispatches a verification email
    /// once the creating transaction has committed.
    async fn register(&self, account: NewAccount) -> Result<User, AccountError>;

    /// Activates the account referenced by a verification token.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::AlreadyActive`] when the account was already
    /// verified, [`AccountError::InvalidToken`] for any bad token. A bad
    /// token never mutates the account.
    async fn verify_email(&self, token: &str) -> Result<User, AccountError>;

    /// Re-issues a verification email when the address belongs to an
    /// inactive account. Always succeeds for well-formed addresses so
    /// callers cannot probe which emails are registered.
    async fn resend_verification(&self, email: &str) -> Result<(), AccountError>;

    /// Paginated user listing for administrators.
    async fn list_users(&self, query: &UserListQuery) -> Result<(Vec<User>, u64), AccountError>;

    /// Resolves an ACTIVE account together with its profile. Inactive and
    /// missing accounts are indistinguishable to callers.
    async fn get_active_account(
        &self,
        user_id: i32,
    ) -> Result<(User, profiles::Model), AccountError>;

    /// Applies a partial update. A supplied email is treated as an address
    /// change: the account is deactivated in the same transaction and a
    /// fresh verification email goes to the new address. Returns whether
    /// the email changed.
    async fn update_account(
        &self,
        user_id: i32,
        changes: AccountChanges,
    ) -> Result<bool, AccountError>;

    /// Deletes the account and its profile. When an avatar exists, the
    /// stored object is purged before the rows go away.
    async fn delete_account(&self, user_id: i32) -> Result<(), AccountError>;
}
