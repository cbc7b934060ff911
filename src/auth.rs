//! Credential utilities: password hashing and admin session tokens.
//!
//! Passwords are hashed with Argon2id (fresh random salt per call, so the
//! same plaintext never produces the same stored hash twice). Admin tokens
//! are short-lived HS256 JWTs carrying the admin's Telegram id; they are the
//! only coupling between the bot and the panel.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Claims embedded in an admin token.
#[derive(Debug, Serialize, Deserialize)]
struct AdminClaims {
    /// Telegram id of the authenticated admin
    tg_id: i64,
    /// Absolute expiry, seconds since the Unix epoch
    exp: i64,
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored hash.
///
/// Malformed hashes verify as `false` rather than erroring: from the
/// caller's point of view a corrupt record and a wrong password are the
/// same thing. The Argon2 verifier compares full digests, so the result
/// does not depend on where the first mismatching byte sits.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

/// Issue a signed admin token for the given Telegram id.
///
/// The token expires `expires_min` minutes from now and is unforgeable
/// without `secret`.
pub fn issue_admin_token(tg_id: i64, secret: &str, expires_min: i64) -> AppResult<String> {
    let exp = Utc::now().timestamp() + expires_min * 60;
    let claims = AdminClaims { tg_id, exp };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::InvalidToken)
}

/// Verify an admin token and return the embedded Telegram id.
///
/// Fails with `AppError::InvalidToken` on a bad signature, structural
/// garbage, or expiry — indistinguishably, so nothing about the failure
/// mode leaks to the caller of the HTTP surface.
pub fn verify_admin_token(token: &str, secret: &str) -> AppResult<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    // No clock leeway: "expired" means expired.
    validation.leeway = 0;

    let data = jsonwebtoken::decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(data.claims.tg_id)
}
