use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::token_service::TokenPurpose;

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
}

/// Authentication middleware for protected routes. Expects an
/// `Authorization: Bearer <access token>` header; the token must carry the
/// `access` purpose and resolve to an active account.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let claims = state.tokens().verify(&token, TokenPurpose::Access)?;
    let user_id = claims.user_id()?;

    let user = state
        .store()
        .get_user_by_id(user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized(
            "This account is not active".to_string(),
        ));
    }

    tracing::Span::current().record("user_id", user.id);

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
        is_admin: user.is_admin,
    });

    Ok(next.run(request).await)
}

/// Inverse guard for registration-style routes: a caller presenting a valid
/// access token is turned away.
pub async fn reject_authenticated(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_bearer(&headers)
        && state.tokens().verify(&token, TokenPurpose::Access).is_ok()
    {
        return Err(ApiError::Forbidden(
            "This action is only available to anonymous users".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Extract a bearer token from the Authorization header
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}
