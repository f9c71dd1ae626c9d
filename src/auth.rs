use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{JwtConfig, MAX_EXPIRY_HOURS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject identifier
    pub jti: String, // JWT ID (unique per token)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub iss: String, // Issuer
}

/// Why a presented token was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("token was issued by an unexpected issuer")]
    IssuerMismatch,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                AuthError::SignatureInvalid
            }
            ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
            _ => AuthError::Malformed,
        }
    }
}

/// Issues and validates HS256 access tokens.
///
/// The signing secret is injected at construction; nothing is read from the
/// environment here.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    /// Access token TTL in hours
    access_token_ttl_hours: i64,
    issuer: String,
}

impl AuthManager {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.trim().is_empty() {
            anyhow::bail!("JWT signing secret is empty. Set JWT_SECRET_KEY");
        }
        if config.issuer.is_empty() {
            anyhow::bail!("JWT issuer is empty. Set JWT_ISSUER");
        }
        if !(1..=MAX_EXPIRY_HOURS).contains(&config.expiry_hours) {
            anyhow::bail!(
                "JWT expiry must be between 1 and {} hours, got {}",
                MAX_EXPIRY_HOURS,
                config.expiry_hours
            );
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // Expiry is the only invalidation mechanism, so it is enforced exactly
        validation.leeway = 0;

        tracing::info!(
            issuer = %config.issuer,
            ttl_hours = config.expiry_hours,
            "Initializing JWT with HS256 algorithm"
        );

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_token_ttl_hours: config.expiry_hours,
            issuer: config.issuer.clone(),
        })
    }

    /// Create an access token for `subject`
    pub fn create_token(&self, subject: &str) -> Result<String> {
        self.create_token_at(subject, Utc::now())
    }

    /// Create a token as if it had been issued at `issued_at`
    pub(crate) fn create_token_at(&self, subject: &str, issued_at: DateTime<Utc>) -> Result<String> {
        let exp = Duration::try_hours(self.access_token_ttl_hours)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .context("Token expiry is out of range")?;

        let claims = Claims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: issued_at.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")
    }

    /// Verify signature, issuer and expiry; returns the claims on success
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let kind = AuthError::from(e);
            tracing::debug!(reason = %kind, "JWT verification failed");
            kind
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::Malformed);
        }

        Ok(data.claims)
    }

    /// Validate `token` and return only the subject identifier
    pub fn subject(&self, token: &str) -> Result<String, AuthError> {
        self.verify_token(token).map(|claims| claims.sub)
    }
}
