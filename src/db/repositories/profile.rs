use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::profiles;

pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get the profile owned by a user
    pub async fn get_by_user_id(&self, user_id: i32) -> Result<Option<profiles::Model>> {
        let profile = profiles::Entity::find()
            .filter(profiles::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query profile by user ID")?;

        Ok(profile)
    }
}
