use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;
use std::fmt;

use super::ApiResponse;
use crate::services::account_service::AccountError;
use crate::services::credential_service::CredentialError;
use crate::services::token_service::TokenError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    /// Field-scoped validation failures, rendered as an error map.
    FieldErrors(BTreeMap<String, String>),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::FieldErrors(errors) => {
                write!(f, "Validation failed for {} field(s)", errors.len())
            }
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiResponse::<()>::error(msg)),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::error("A database error occurred"),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, ApiResponse::<()>::error(msg)),
            ApiError::FieldErrors(errors) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::<()>::field_errors(errors),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ApiResponse::<()>::error(msg)),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::error("An internal error occurred"),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ApiResponse::<()>::error(msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiResponse::<()>::error(msg)),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => {
                ApiError::Unauthorized("The provided token has expired".to_string())
            }
            TokenError::Malformed | TokenError::WrongPurpose => {
                ApiError::Unauthorized("The provided token is invalid".to_string())
            }
            TokenError::Signing(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AccountError::AlreadyActive => {
                ApiError::Conflict("This account is already active".to_string())
            }
            AccountError::InvalidToken(e) => e.into(),
            AccountError::Validation(msg) => ApiError::ValidationError(msg),
            AccountError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::UserNotFound => {
                ApiError::NotFound("User with this email not found".to_string())
            }
            CredentialError::InvalidToken(e) => e.into(),
            CredentialError::Validation(msg) => ApiError::ValidationError(msg),
            CredentialError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }

    /// Single field-scoped error, e.g. the refresh-token body field.
    pub fn field(field: &str, msg: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), msg.into());
        ApiError::FieldErrors(errors)
    }
}
