use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::entities::revoked_tokens;

pub struct RevokedTokenRepository {
    conn: DatabaseConnection,
}

impl RevokedTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Blacklist a refresh token by its `jti`. Inserting an already
    /// blacklisted token is a no-op, so concurrent revocations of the same
    /// token cannot fail.
    pub async fn revoke(&self, jti: &str, user_id: i32, expires_at: &str) -> Result<()> {
        let row = revoked_tokens::ActiveModel {
            jti: Set(jti.to_string()),
            user_id: Set(user_id),
            expires_at: Set(expires_at.to_string()),
            revoked_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        revoked_tokens::Entity::insert(row)
            .on_conflict(
                OnConflict::column(revoked_tokens::Column::Jti)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert revoked token")?;

        Ok(())
    }

    pub async fn is_revoked(&self, jti: &str) -> Result<bool> {
        let row = revoked_tokens::Entity::find_by_id(jti)
            .one(&self.conn)
            .await
            .context("Failed to query revoked token")?;

        Ok(row.is_some())
    }
}
