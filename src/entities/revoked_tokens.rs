use sea_orm::entity::prelude::*;

/// Blacklist entry for a refresh token. Keyed by the token's `jti` claim;
/// a row here is terminal, the token is rejected forever.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "revoked_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub jti: String,

    pub user_id: i32,

    /// Expiry of the underlying token, kept so stale rows can be pruned.
    pub expires_at: String,

    pub revoked_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
