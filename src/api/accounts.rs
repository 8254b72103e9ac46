use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_email, validate_page_params, validate_password, validate_username};
use super::{ApiError, ApiResponse, AppState, MessageResponse, UserDto, UserListResponse};
use crate::db::{NewAccount, UserListQuery};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct UserListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

const fn default_page() -> u64 {
    1
}

const fn default_per_page() -> u64 {
    20
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create an inactive account and send the activation link by email.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    let mut errors = BTreeMap::new();

    if let Err(msg) = validate_username(&payload.username) {
        errors.insert("username".to_string(), msg);
    }
    if let Err(msg) = validate_email(&payload.email) {
        errors.insert("email".to_string(), msg);
    }
    if let Err(msg) = validate_password(&payload.password) {
        errors.insert("password".to_string(), msg);
    }
    if payload.password != payload.confirm_password {
        errors.insert(
            "confirm_password".to_string(),
            "Passwords do not match".to_string(),
        );
    }

    // Uniqueness only once the formats hold, so the map stays stable
    if !errors.contains_key("username")
        && state
            .store()
            .username_taken(&payload.username)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to check username: {e}")))?
    {
        errors.insert(
            "username".to_string(),
            "A user with that username already exists".to_string(),
        );
    }
    if !errors.contains_key("email")
        && state
            .store()
            .email_taken(&payload.email)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to check email: {e}")))?
    {
        errors.insert(
            "email".to_string(),
            "A user with that email already exists".to_string(),
        );
    }

    if !errors.is_empty() {
        return Err(ApiError::FieldErrors(errors));
    }

    state
        .accounts()
        .register(NewAccount {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MessageResponse::new(
            "We've sent you an activation link via email",
        ))),
    ))
}

/// GET /auth/verify/{token}
/// Activate the account referenced by a verification token.
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.accounts().verify_email(&token).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Account activated successfully",
    ))))
}

/// POST /auth/resend-verification
/// Re-issue the activation link. The response never reveals whether the
/// address belongs to an account.
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResendVerificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    if let Err(msg) = validate_email(&payload.email) {
        return Err(ApiError::field("email", msg));
    }

    state.accounts().resend_verification(&payload.email).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(MessageResponse::new(
            "If that address belongs to an unverified account, a new activation link is on its way",
        ))),
    ))
}

/// GET /users
/// Paginated user listing, administrators only.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<UserListParams>,
) -> Result<Json<ApiResponse<UserListResponse>>, ApiError> {
    if !current.is_admin {
        return Err(ApiError::Forbidden(
            "Administrator access required".to_string(),
        ));
    }

    let (page, per_page) = validate_page_params(params.page, params.per_page)?;

    let (users, total) = state
        .accounts()
        .list_users(&UserListQuery {
            page,
            per_page,
            is_active: params.is_active,
            search: params.search,
        })
        .await?;

    Ok(Json(ApiResponse::success(UserListResponse {
        users: users.into_iter().map(UserDto::from).collect(),
        total,
        page,
        per_page,
    })))
}
