use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{profiles, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_superuser: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            is_active: model.is_active,
            is_admin: model.is_admin,
            is_superuser: model.is_superuser,
            last_login: model.last_login,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Payload for creating an account. The password arrives in plain text and
/// is hashed inside the repository.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial update applied to a user and its profile. Absent fields are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_key: Option<String>,
}

impl AccountChanges {
    #[must_use]
    pub const fn touches_profile(&self) -> bool {
        self.display_name.is_some() || self.bio.is_some() || self.avatar_key.is_some()
    }
}

/// Filter and paging parameters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    pub page: u64,
    pub per_page: u64,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create an inactive user together with its empty profile row.
    /// Both inserts run in one transaction; the caller only sees the
    /// account once the transaction has committed.
    pub async fn create(&self, account: NewAccount, config: &SecurityConfig) -> Result<User> {
        let password = account.password;
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let txn = self.conn.begin().await?;

        let user = users::ActiveModel {
            username: Set(account.username),
            email: Set(account.email),
            password_hash: Set(password_hash),
            is_active: Set(false),
            is_admin: Set(false),
            is_superuser: Set(false),
            last_login: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert user")?;

        profiles::ActiveModel {
            user_id: Set(user.id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert profile")?;

        txn.commit().await?;

        Ok(User::from(user))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Get user by email address
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.conn)
            .await
            .context("Failed to count users by username")?;

        Ok(count > 0)
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("Failed to count users by email")?;

        Ok(count > 0)
    }

    /// Paginated listing with optional activity filter and username/email search.
    pub async fn list(&self, query: &UserListQuery) -> Result<(Vec<User>, u64)> {
        let mut select = users::Entity::find();

        if let Some(is_active) = query.is_active {
            select = select.filter(users::Column::IsActive.eq(is_active));
        }

        if let Some(term) = query.search.as_deref().filter(|t| !t.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(users::Column::Username.contains(term))
                    .add(users::Column::Email.contains(term)),
            );
        }

        let paginator = select
            .order_by_asc(users::Column::Id)
            .paginate(&self.conn, query.per_page);

        let total = paginator
            .num_items()
            .await
            .context("Failed to count users")?;

        let page = query.page.saturating_sub(1);
        let items = paginator
            .fetch_page(page)
            .await
            .context("Failed to fetch user page")?;

        Ok((items.into_iter().map(User::from).collect(), total))
    }

    /// Verify password for a user by username.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        verify_hash(user.password_hash, password.to_string()).await
    }

    /// Verify password for a user by ID (used by the authenticated
    /// change-password flow).
    pub async fn verify_password_for_id(&self, user_id: i32, password: &str) -> Result<bool> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        verify_hash(user.password_hash, password.to_string()).await
    }

    /// Update password for a user (hashes the new password)
    pub async fn set_password(
        &self,
        user_id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Flip the activation flag on a user.
    pub async fn set_active(&self, user_id: i32, is_active: bool) -> Result<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for activation update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn record_login(&self, user_id: i32) -> Result<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for login stamp")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Apply a partial account update. The user row and the profile row are
    /// written in one transaction; when `deactivate` is set (email change)
    /// the activation flag drops in that same transaction.
    pub async fn apply_changes(
        &self,
        user_id: i32,
        changes: &AccountChanges,
        deactivate: bool,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let txn = self.conn.begin().await?;

        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .context("Failed to query user for update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {user_id}"))?;

        let mut active: users::ActiveModel = user.into();
        if let Some(username) = &changes.username {
            active.username = Set(username.clone());
        }
        if let Some(email) = &changes.email {
            active.email = Set(email.clone());
        }
        if deactivate {
            active.is_active = Set(false);
        }
        active.updated_at = Set(now.clone());
        active.update(&txn).await?;

        if changes.touches_profile() {
            let profile = profiles::Entity::find()
                .filter(profiles::Column::UserId.eq(user_id))
                .one(&txn)
                .await
                .context("Failed to query profile for update")?
                .ok_or_else(|| anyhow::anyhow!("Profile not found for user: {user_id}"))?;

            let mut active: profiles::ActiveModel = profile.into();
            if let Some(display_name) = &changes.display_name {
                active.display_name = Set(Some(display_name.clone()));
            }
            if let Some(bio) = &changes.bio {
                active.bio = Set(Some(bio.clone()));
            }
            if let Some(avatar_key) = &changes.avatar_key {
                active.avatar_key = Set(Some(avatar_key.clone()));
            }
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        txn.commit().await?;

        Ok(())
    }

    /// Delete a user and its profile. The profile row goes first so no
    /// orphan survives a partial failure.
    pub async fn delete(&self, user_id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        profiles::Entity::delete_many()
            .filter(profiles::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .context("Failed to delete profile")?;

        let result = users::Entity::delete_by_id(user_id)
            .exec(&txn)
            .await
            .context("Failed to delete user")?;

        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }
}

/// Run Argon2 verification in a blocking task.
async fn verify_hash(password_hash: String, password: String) -> Result<bool> {
    let is_valid = task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        let argon2 = Argon2::default();
        Ok::<bool, anyhow::Error>(
            argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")??;

    Ok(is_valid)
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default (high memory) params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
