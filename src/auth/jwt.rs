//! JWT Token Service
//! Mission: Issue and verify signed, time-limited access tokens

use crate::auth::models::{Claims, User};
use anyhow::{Context, Result};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use tracing::debug;

/// Default lifetime of an access token
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Startup failure: the token service cannot run without a secret
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenConfigError {
    #[error("JWT signing secret is unset or empty")]
    MissingSecret,
}

/// Why a request carries no usable identity.
///
/// Callers must not expose which verification step failed; everything past
/// header parsing collapses into `InvalidCredential`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    MissingCredential,
    InvalidCredential,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::MissingCredential => write!(f, "Missing authorization token"),
            CredentialError::InvalidCredential => write!(f, "Invalid or expired token"),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Signs and validates access tokens with a process-wide HS256 secret
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service. Fails if the secret is empty.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenConfigError> {
        if secret.trim().is_empty() {
            return Err(TokenConfigError::MissingSecret);
        }

        let mut validation = Validation::default();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    /// Issue a token for an already-authenticated user
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .context("Invalid timestamp")?
            .timestamp();

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            iat: now.timestamp().max(0) as usize,
            exp: expiration.max(0) as usize,
        };

        debug!(
            user_id = %user.id,
            is_admin = user.is_admin,
            "Issuing access token, expires in {}h",
            self.ttl.num_hours()
        );

        encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to generate JWT")
    }

    /// Verify signature and expiry of a raw token
    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        if token.is_empty() {
            return Err(CredentialError::InvalidCredential);
        }

        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "Rejected access token");
            CredentialError::InvalidCredential
        })?;

        Ok(decoded.claims)
    }

    /// Verify the `Authorization: Bearer <token>` header of a request
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<Claims, CredentialError> {
        let token = bearer_token(headers)?;
        self.verify(token)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, CredentialError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(CredentialError::MissingCredential)?
        .to_str()
        .map_err(|_| CredentialError::InvalidCredential)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(CredentialError::MissingCredential)
}
