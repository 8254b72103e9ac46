use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, AvatarStorage, CredentialService, LocalAvatarStorage, LogMailer, Mailer,
    SeaOrmAccountService, SeaOrmCredentialService, SmtpMailer, TokenService,
};

mod accounts;
pub mod auth;
mod credentials;
mod error;
mod observability;
mod profiles;
mod sessions;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: TokenService,

    pub accounts: Arc<dyn AccountService>,

    pub credentials: Arc<dyn CredentialService>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn accounts(&self) -> &dyn AccountService {
        self.accounts.as_ref()
    }

    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialService {
        self.credentials.as_ref()
    }
}

/// Build application state with explicit mailer and storage backends.
/// Tests use this to inject recording fakes.
pub async fn create_app_state(
    config: Config,
    mailer: Arc<dyn Mailer>,
    avatar_storage: Arc<dyn AvatarStorage>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tokens = TokenService::new(&config.auth);

    let accounts = Arc::new(SeaOrmAccountService::new(
        store.clone(),
        tokens.clone(),
        mailer.clone(),
        avatar_storage,
        config.security.clone(),
    )) as Arc<dyn AccountService>;

    let credentials = Arc::new(SeaOrmCredentialService::new(
        store.clone(),
        tokens.clone(),
        mailer,
        config.security.clone(),
    )) as Arc<dyn CredentialService>;

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        tokens,
        accounts,
        credentials,
        prometheus_handle,
    }))
}

/// Build application state with the configured production backends.
pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let mailer: Arc<dyn Mailer> = if config.smtp.enabled {
        Arc::new(SmtpMailer::new(
            config.smtp.clone(),
            config.server.public_url.clone(),
        ))
    } else {
        Arc::new(LogMailer::new(config.server.public_url.clone()))
    };

    let avatar_storage: Arc<dyn AvatarStorage> =
        Arc::new(LocalAvatarStorage::new(&config.storage.avatar_path));

    create_app_state(config, mailer, avatar_storage, prometheus_handle).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let protected_routes = Router::new()
        .route("/users", get(accounts::list_users))
        .route("/auth/change-password", put(credentials::change_password))
        .route("/profiles/{id}", patch(profiles::update_profile))
        .route("/profiles/{id}", delete(profiles::delete_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let anonymous_routes = Router::new()
        .route("/auth/register", post(accounts::register))
        .route("/auth/verify/{token}", get(accounts::verify_email))
        .route(
            "/auth/resend-verification",
            post(accounts::resend_verification),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::reject_authenticated,
        ));

    let public_routes = Router::new()
        .route("/auth/login", post(sessions::login))
        .route("/auth/refresh", post(sessions::refresh))
        .route("/auth/block-token", post(sessions::block_token))
        .route("/auth/reset-password", post(credentials::reset_password))
        .route("/auth/set-password/{token}", post(credentials::set_password))
        .route("/profiles/{id}", get(profiles::get_profile))
        .route("/metrics", get(observability::get_metrics));

    let api_router = protected_routes
        .merge(anonymous_routes)
        .merge(public_routes)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
}
