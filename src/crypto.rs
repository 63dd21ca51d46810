//! Credential and session-token primitives
//!
//! Passwords are stored as Argon2id PHC strings. Sessions are HS256 JWTs
//! carrying the user id and email, signed with the configured secret.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppConfig, ConfigError};

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to hash password: {0}")]
    HashingFailed(String),
    #[error("stored password hash is malformed")]
    InvalidHashFormat,
    #[error("failed to verify password: {0}")]
    VerificationFailed(String),
    #[error("failed to sign session token: {0}")]
    SigningFailed(String),
    #[error("session token has expired")]
    TokenExpired,
    #[error("session token is invalid")]
    InvalidToken,
}

/// Hashes `password` with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CryptoError::HashingFailed(err.to_string()))
}

/// Checks `password` against a stored PHC string.
///
/// A mismatch is `Ok(false)`; only malformed hashes and internal failures are errors.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CryptoError> {
    let parsed = PasswordHash::new(hash).map_err(|_| CryptoError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(CryptoError::VerificationFailed(err.to_string())),
    }
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed session token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Signing and verification keys for session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let secret = config.signing_secret()?;
        Ok(Self::new(
            secret.as_bytes(),
            Duration::minutes(config.session_ttl_minutes),
        ))
    }

    /// Signs a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, CryptoError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| CryptoError::SigningFailed(err.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Verifies signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, CryptoError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => CryptoError::TokenExpired,
                _ => CryptoError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-at-least-32-bytes!!";

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("password123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("password123", &hash).unwrap());
        assert!(!verify_password("password124", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("same").unwrap();
        let second = hash_password("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("password123", "plaintext"),
            Err(CryptoError::InvalidHashFormat)
        ));
    }

    #[test]
    fn issued_token_verifies_with_same_keys() {
        let keys = SessionKeys::new(SECRET, Duration::minutes(30));
        let user_id = Uuid::new_v4();

        let issued = keys.issue(user_id, "demo@example.com").unwrap();
        assert_eq!(issued.expires_in, 1800);

        let claims = keys.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "demo@example.com");
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = SessionKeys::new(SECRET, Duration::minutes(30));
        let other = SessionKeys::new(b"another-secret-that-is-32-bytes-long!", Duration::minutes(30));

        let issued = other.issue(Uuid::new_v4(), "x@example.com").unwrap();
        assert!(matches!(
            keys.verify(&issued.token),
            Err(CryptoError::InvalidToken)
        ));
        assert!(matches!(
            keys.verify("not-a-jwt"),
            Err(CryptoError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new(SECRET, Duration::minutes(-10));

        let issued = keys.issue(Uuid::new_v4(), "x@example.com").unwrap();
        assert!(matches!(
            keys.verify(&issued.token),
            Err(CryptoError::TokenExpired)
        ));
    }
}
