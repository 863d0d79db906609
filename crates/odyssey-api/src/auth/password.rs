//! Password hashing.
//!
//! Hashes are bcrypt. Both functions are CPU-bound; async callers run them
//! on the blocking pool.

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::ApiError;
use tracing::instrument;

/// Hash to verify when a login names an unknown user, so that unknown and
/// known usernames take the same time to reject. Must use the same cost as
/// stored hashes.
pub fn dummy_hash(cost: u32) -> Result<String, ApiError> {
    hash_password("odyssey-unknown-user", cost)
}

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `ApiError::Internal` if the cost is outside 4-14 or hashing fails.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(ApiError::Internal(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    bcrypt::hash(password, cost)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(password, hash)
        .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))
}

/// `hash_password` on the blocking pool.
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
}

/// `verify_password` on the blocking pool.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Verification task failed: {}", e)))?
}
