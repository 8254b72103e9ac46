use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_email, validate_password};
use super::{ApiError, ApiResponse, AppState, MessageResponse};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub confirm_password: String,
}

fn validate_new_password(
    new_password: &str,
    confirm_password: &str,
) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();

    if let Err(msg) = validate_password(new_password) {
        errors.insert("new_password".to_string(), msg);
    }
    if new_password != confirm_password {
        errors.insert(
            "confirm_password".to_string(),
            "Passwords do not match".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::FieldErrors(errors))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// PUT /auth/change-password
/// Change password for the authenticated user (requires the current one).
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_new_password(&payload.new_password, &payload.confirm_password)?;

    state
        .credentials()
        .change_password(current.id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Your password changed successfully",
    ))))
}

/// POST /auth/reset-password
/// Request a password reset link. Unknown addresses get a 404.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    if let Err(msg) = validate_email(&payload.email) {
        return Err(ApiError::field("email", msg));
    }

    state.credentials().request_reset(&payload.email).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(MessageResponse::new(
            "A password reset link has been sent to your email",
        ))),
    ))
}

/// POST /auth/set-password/{token}
/// Set a new password; the reset token alone authorizes the change.
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_new_password(&payload.new_password, &payload.confirm_password)?;

    state
        .credentials()
        .set_password(&token, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password changed successfully",
    ))))
}
