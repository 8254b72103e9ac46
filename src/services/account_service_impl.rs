//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{AccountChanges, NewAccount, Store, User, UserListQuery};
use crate::entities::profiles;
use crate::services::account_service::{AccountError, AccountService};
use crate::services::mailer::{AccountMail, MailPurpose, Mailer};
use crate::services::storage::AvatarStorage;
use crate::services::token_service::{TokenError, TokenPurpose, TokenService};

pub struct SeaOrmAccountService {
    store: Store,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    storage: Arc<dyn AvatarStorage>,
    security: SecurityConfig,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(
        store: Store,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn AvatarStorage>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            storage,
            security,
        }
    }

    fn send_verification_email(&self, user_id: i32, email: &str) -> Result<(), AccountError> {
        let token = self
            .tokens
            .issue(user_id, TokenPurpose::Verification)
            .map_err(|e| AccountError::Internal(e.to_string()))?;
        self.mailer.dispatch(AccountMail {
            to: email.to_string(),
            user_id,
            purpose: MailPurpose::Verification,
            token,
        });
        Ok(())
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(&self, account: NewAccount) -> Result<User, AccountError> {
        let email = account.email.clone();

        // The user and profile rows commit together inside the repository;
        // the email only goes out once the transaction has returned.
        let user = self.store.create_account(account, &self.security).await?;

        self.send_verification_email(user.id, &email)?;

        info!(user_id = user.id, "Account registered, pending verification");

        Ok(user)
    }

    async fn verify_email(&self, token: &str) -> Result<User, AccountError> {
        let claims = self.tokens.verify(token, TokenPurpose::Verification)?;
        let user_id = claims.user_id()?;

        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AccountError::InvalidToken(TokenError::Malformed))?;

        if user.is_active {
            return Err(AccountError::AlreadyActive);
        }

        self.store.set_user_active(user.id, true).await?;

        info!(user_id = user.id, "Account activated");

        self.store
            .get_user_by_id(user.id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    async fn resend_verification(&self, email: &str) -> Result<(), AccountError> {
        match self.store.get_user_by_email(email).await? {
            Some(user) if !user.is_active => {
                self.send_verification_email(user.id, email)?;
                info!(user_id = user.id, "Verification email re-issued");
            }
            _ => {
                // Unknown or already-active address: same outcome for the
                // caller, nothing dispatched.
            }
        }

        Ok(())
    }

    async fn list_users(&self, query: &UserListQuery) -> Result<(Vec<User>, u64), AccountError> {
        Ok(self.store.list_users(query).await?)
    }

    async fn get_active_account(
        &self,
        user_id: i32,
    ) -> Result<(User, profiles::Model), AccountError> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AccountError::UserNotFound)?;

        let profile = self
            .store
            .get_profile_for_user(user.id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        Ok((user, profile))
    }

    async fn update_account(
        &self,
        user_id: i32,
        changes: AccountChanges,
    ) -> Result<bool, AccountError> {
        let email_changed = changes.email.is_some();

        // Record save and deactivation share one transaction; the email
        // dispatch is best-effort afterwards.
        self.store
            .apply_account_changes(user_id, &changes, email_changed)
            .await?;

        if let Some(new_email) = &changes.email {
            self.send_verification_email(user_id, new_email)?;
            info!(
                user_id = user_id,
                "Email changed, account deactivated pending re-verification"
            );
        }

        Ok(email_changed)
    }

    async fn delete_account(&self, user_id: i32) -> Result<(), AccountError> {
        let profile = self.store.get_profile_for_user(user_id).await?;

        // Purge the stored avatar before the rows disappear so no orphan
        // object survives in external storage.
        if let Some(avatar_key) = profile.as_ref().and_then(|p| p.avatar_key.as_deref()) {
            self.storage
                .delete_object(avatar_key)
                .await
                .map_err(|e| AccountError::Internal(e.to_string()))?;
        }

        let deleted = self.store.delete_user(user_id).await?;
        if !deleted {
            return Err(AccountError::UserNotFound);
        }

        info!(user_id = user_id, "Account deleted");

        Ok(())
    }
}
