use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::{AccessTokenResponse, ApiError, ApiResponse, AppState, TokenPairResponse};
use crate::services::token_service::TokenPurpose;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Deserialize)]
pub struct BlockTokenRequest {
    #[serde(default)]
    pub refresh: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with username and password, returns an access/refresh pair
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenPairResponse>>, ApiError> {
    // Validate input
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    // Verify credentials against database
    let is_valid = state
        .store()
        .verify_user_password(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?;

    if !is_valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user = state
        .store()
        .get_user_by_username(&payload.username)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    // An unverified account holds correct credentials but may not log in
    if !user.is_active {
        return Err(ApiError::Unauthorized(
            "This account is not active".to_string(),
        ));
    }

    let access = state.tokens().issue(user.id, TokenPurpose::Access)?;
    let refresh = state.tokens().issue(user.id, TokenPurpose::Refresh)?;

    state
        .store()
        .record_login(user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to record login: {e}")))?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::success(TokenPairResponse {
        access,
        refresh,
    })))
}

/// POST /auth/refresh
/// Mint a fresh access token from a refresh token. Blacklisted refresh
/// tokens are rejected forever.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AccessTokenResponse>>, ApiError> {
    let claims = state.tokens().verify(&payload.refresh, TokenPurpose::Refresh)?;

    if state
        .store()
        .is_token_revoked(&claims.jti)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to check blacklist: {e}")))?
    {
        return Err(ApiError::Unauthorized(
            "This token has been blocked".to_string(),
        ));
    }

    let user_id = claims.user_id()?;
    let user = state
        .store()
        .get_user_by_id(user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized(
            "This account is not active".to_string(),
        ));
    }

    let access = state.tokens().issue(user.id, TokenPurpose::Access)?;

    Ok(Json(ApiResponse::success(AccessTokenResponse { access })))
}

/// POST /auth/block-token
/// Blacklist a refresh token. The terminal state is idempotent: blocking an
/// already-blocked token succeeds the same way.
pub async fn block_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BlockTokenRequest>,
) -> Result<StatusCode, ApiError> {
    if payload.refresh.is_empty() {
        return Err(ApiError::field("refresh", "This field is required"));
    }

    let claims = state
        .tokens()
        .verify(&payload.refresh, TokenPurpose::Refresh)
        .map_err(|_| {
            ApiError::field("refresh", "The provided token is invalid or has expired")
        })?;

    let user_id = claims.user_id().map_err(|_| {
        ApiError::field("refresh", "The provided token is invalid or has expired")
    })?;

    state
        .store()
        .revoke_token(&claims.jti, user_id, &claims.expires_at())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to block token: {e}")))?;

    tracing::info!(user_id = user_id, "Refresh token blocked");

    Ok(StatusCode::NO_CONTENT)
}
