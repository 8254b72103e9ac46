use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::profiles;

pub mod migrator;
pub mod repositories;

pub use repositories::user::{AccountChanges, NewAccount, User, UserListQuery};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn profile_repo(&self) -> repositories::profile::ProfileRepository {
        repositories::profile::ProfileRepository::new(self.conn.clone())
    }

    fn revoked_token_repo(&self) -> repositories::token::RevokedTokenRepository {
        repositories::token::RevokedTokenRepository::new(self.conn.clone())
    }

    // ========== User Repository Methods ==========

    pub async fn create_account(
        &self,
        account: NewAccount,
        config: &crate::config::SecurityConfig,
    ) -> Result<User> {
        self.user_repo().create(account, config).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool> {
        self.user_repo().username_taken(username).await
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool> {
        self.user_repo().email_taken(email).await
    }

    pub async fn list_users(&self, query: &UserListQuery) -> Result<(Vec<User>, u64)> {
        self.user_repo().list(query).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn verify_password_for_id(&self, user_id: i32, password: &str) -> Result<bool> {
        self.user_repo()
            .verify_password_for_id(user_id, password)
            .await
    }

    pub async fn set_user_password(
        &self,
        user_id: i32,
        new_password: &str,
        config: &crate::config::SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .set_password(user_id, new_password, config)
            .await
    }

    pub async fn set_user_active(&self, user_id: i32, is_active: bool) -> Result<()> {
        self.user_repo().set_active(user_id, is_active).await
    }

    pub async fn record_login(&self, user_id: i32) -> Result<()> {
        self.user_repo().record_login(user_id).await
    }

    pub async fn apply_account_changes(
        &self,
        user_id: i32,
        changes: &AccountChanges,
        deactivate: bool,
    ) -> Result<()> {
        self.user_repo()
            .apply_changes(user_id, changes, deactivate)
            .await
    }

    pub async fn delete_user(&self, user_id: i32) -> Result<bool> {
        self.user_repo().delete(user_id).await
    }

    // ========== Profile Repository Methods ==========

    pub async fn get_profile_for_user(&self, user_id: i32) -> Result<Option<profiles::Model>> {
        self.profile_repo().get_by_user_id(user_id).await
    }

    // ========== Revoked Token Repository Methods ==========

    pub async fn revoke_token(&self, jti: &str, user_id: i32, expires_at: &str) -> Result<()> {
        self.revoked_token_repo()
            .revoke(jti, user_id, expires_at)
            .await
    }

    pub async fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        self.revoked_token_repo().is_revoked(jti).await
    }
}
