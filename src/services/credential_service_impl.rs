//! `SeaORM` implementation of the `CredentialService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::services::credential_service::{CredentialError, CredentialService};
use crate::services::mailer::{AccountMail, MailPurpose, Mailer};
use crate::services::token_service::{TokenError, TokenPurpose, TokenService};

pub struct SeaOrmCredentialService {
    store: Store,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    security: SecurityConfig,
}

impl SeaOrmCredentialService {
    #[must_use]
    pub fn new(
        store: Store,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            security,
        }
    }
}

#[async_trait]
impl CredentialService for SeaOrmCredentialService {
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), CredentialError> {
        if current_password == new_password {
            return Err(CredentialError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let is_valid = self
            .store
            .verify_password_for_id(user_id, current_password)
            .await?;

        if !is_valid {
            return Err(CredentialError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store
            .set_user_password(user_id, new_password, &self.security)
            .await?;

        info!(user_id = user_id, "Password changed");

        Ok(())
    }

    async fn request_reset(&self, email: &str) -> Result<(), CredentialError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(CredentialError::UserNotFound)?;

        let token = self
            .tokens
            .issue(user.id, TokenPurpose::ResetPassword)
            .map_err(|e| CredentialError::Internal(e.to_string()))?;
        self.mailer.dispatch(AccountMail {
            to: user.email.clone(),
            user_id: user.id,
            purpose: MailPurpose::PasswordReset,
            token,
        });

        info!(user_id = user.id, "Password reset requested");

        Ok(())
    }

    async fn set_password(&self, token: &str, new_password: &str) -> Result<(), CredentialError> {
        let claims = self.tokens.verify(token, TokenPurpose::ResetPassword)?;
        let user_id = claims.user_id()?;

        // The token may legitimately resolve an inactive account; only a
        // nonexistent user collapses into the invalid-token failure.
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(CredentialError::InvalidToken(TokenError::Malformed))?;

        self.store
            .set_user_password(user.id, new_password, &self.security)
            .await?;

        info!(user_id = user.id, "Password set via reset token");

        Ok(())
    }
}
