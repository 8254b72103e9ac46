use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{validate_email, validate_username};
use super::{ApiError, ApiResponse, AppState, MessageResponse, ProfileDto};
use crate::db::AccountChanges;

// ============================================================================
// Request Types
// ============================================================================

/// Partial update; absent fields are left untouched.
#[derive(Deserialize, Default)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_key: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /profiles/{id}
/// Public read of an active user's profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ProfileDto>>, ApiError> {
    let (user, profile) = state.accounts().get_active_account(id).await?;

    Ok(Json(ApiResponse::success(ProfileDto::from_parts(
        user, profile,
    ))))
}

/// PATCH /profiles/{id}
/// Owner-only partial update. Changing the email deactivates the account
/// until the new address is verified; every other field commits regardless.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let (user, _) = state.accounts().get_active_account(id).await?;

    if current.id != user.id {
        return Err(ApiError::Forbidden(
            "You can only modify your own profile".to_string(),
        ));
    }

    let mut errors = BTreeMap::new();

    // Re-submitting the current value is a no-op, not a change
    let username = payload.username.filter(|u| *u != user.username);
    let email = payload.email.filter(|e| *e != user.email);

    if let Some(username) = &username {
        if let Err(msg) = validate_username(username) {
            errors.insert("username".to_string(), msg);
        } else if state
            .store()
            .username_taken(username)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to check username: {e}")))?
        {
            errors.insert(
                "username".to_string(),
                "A user with that username already exists".to_string(),
            );
        }
    }

    if let Some(email) = &email {
        if let Err(msg) = validate_email(email) {
            errors.insert("email".to_string(), msg);
        } else if state
            .store()
            .email_taken(email)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to check email: {e}")))?
        {
            errors.insert(
                "email".to_string(),
                "A user with that email already exists".to_string(),
            );
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::FieldErrors(errors));
    }

    let changes = AccountChanges {
        username,
        email,
        display_name: payload.display_name,
        bio: payload.bio,
        avatar_key: payload.avatar_key,
    };

    let email_changed = state.accounts().update_account(user.id, changes).await?;

    let message = if email_changed {
        "Updated profile successfully. A verification link has been sent to your new email address"
    } else {
        "Updated profile successfully"
    };

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

/// DELETE /profiles/{id}
/// Owner-only account deletion; the stored avatar is purged first.
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let (user, _) = state.accounts().get_active_account(id).await?;

    if current.id != user.id {
        return Err(ApiError::Forbidden(
            "You can only delete your own profile".to_string(),
        ));
    }

    state.accounts().delete_account(user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
