//! Signed, time-bound bearer tokens (HS256 JWT)

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    services::clock::Clock,
};

/// Lifetime used when the caller does not pick one
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,
    #[error("Token has expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        AppError::Authentication(e.to_string())
    }
}

/// JWT claims. `sub` is optional on the wire so a missing subject reads as `Invalid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// An issued token and its absolute expiry (unix seconds)
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &str, default_ttl: Duration, clock: Arc<dyn Clock>) -> AppResult<Self> {
        if secret.trim().is_empty() {
            return Err(AppError::Misconfigured("Token signing secret is empty".to_string()));
        }
        if default_ttl <= Duration::zero() {
            return Err(AppError::Misconfigured("Token lifetime must be positive".to_string()));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            default_ttl,
            clock,
        })
    }

    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let ttl = Duration::try_minutes(config.token_ttl_minutes)
            .ok_or_else(|| AppError::Misconfigured("Token lifetime is too large".to_string()))?;
        Self::new(&config.jwt_secret, ttl, clock)
    }

    /// Issue a token for `subject` valid for `ttl` (default lifetime when `None`)
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> AppResult<AccessToken> {
        let now = self.clock.now().timestamp();
        let exp = now + ttl.unwrap_or(self.default_ttl).num_seconds();

        let claims = AccessClaims {
            sub: Some(subject.to_string()),
            exp,
            iat: now,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(AccessToken {
            token,
            expires_at: exp,
        })
    }

    /// Check signature and expiry, returning the subject
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        // Expiry is compared against our own clock below, without leeway
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                TokenError::Invalid
            })?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        claims
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(TokenError::Invalid)
    }
}
