//! Issues and validates the signed bearer tokens used across the account
//! flows. Every token is HS256-signed, time-bound, and tagged with a single
//! purpose so a verification link can never double as a reset link.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

/// What a token is allowed to do. Serialized into the `purpose` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Verification,
    ResetPassword,
    Access,
    Refresh,
}

/// Errors specific to token validation.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("The provided token is invalid")]
    Malformed,

    #[error("The provided token has expired")]
    Expired,

    #[error("The provided token cannot be used for this operation")]
    WrongPurpose,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub purpose: TokenPurpose,
    /// Expiration time (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Token ID, referenced by the revocation blacklist
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Malformed)
    }

    /// Expiry as an RFC 3339 timestamp, for persisting alongside a
    /// blacklist entry.
    #[must_use]
    pub fn expires_at(&self) -> String {
        chrono::DateTime::from_timestamp(self.exp, 0)
            .unwrap_or_default()
            .to_rfc3339()
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    verification_ttl_secs: i64,
    reset_ttl_secs: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
            verification_ttl_secs: config.verification_ttl_secs,
            reset_ttl_secs: config.reset_ttl_secs,
        }
    }

    const fn ttl_for(&self, purpose: TokenPurpose) -> i64 {
        match purpose {
            TokenPurpose::Access => self.access_ttl_secs,
            TokenPurpose::Refresh => self.refresh_ttl_secs,
            TokenPurpose::Verification => self.verification_ttl_secs,
            TokenPurpose::ResetPassword => self.reset_ttl_secs,
        }
    }

    /// Issue a token with the configured lifetime for its purpose.
    pub fn issue(&self, user_id: i32, purpose: TokenPurpose) -> Result<String, TokenError> {
        self.issue_with_ttl(user_id, purpose, self.ttl_for(purpose))
    }

    /// Issue a token with an explicit lifetime in seconds.
    pub fn issue_with_ttl(
        &self,
        user_id: i32,
        purpose: TokenPurpose,
        ttl_secs: i64,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            purpose,
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate signature, expiry, and purpose. A token failing any of the
    /// three never reaches a caller as claims, so no user mutation can be
    /// driven by a bad token.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Malformed,
                }
            })?;

        let claims = token_data.claims;

        if claims.purpose != expected {
            return Err(TokenError::WrongPurpose);
        }

        if claims.jti.is_empty() {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }
}
