//! Session token issuing and validation.
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET`.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only HS256 is accepted; the algorithm in the header is not trusted
//! - Expired tokens are rejected
//! - Every failure produces the same generic message

use crate::auth::AuthUser;
use crate::errors::ApiError;
use chrono::Utc;
use common::jwt::{Role, UserClaims, MAX_JWT_SIZE_BYTES};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use tracing::instrument;

/// Message returned for every rejected token.
pub const INVALID_TOKEN_MESSAGE: &str = "The session token is invalid or expired";

/// Issues and validates session tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service from a shared secret.
    ///
    /// # Arguments
    ///
    /// * `secret` - HS256 key material (at least 32 bytes, checked by config)
    /// * `ttl` - Lifetime of issued tokens
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for a user.
    #[instrument(skip_all, name = "odyssey.auth.issue_token")]
    pub fn issue(&self, user_id: i64, username: &str, role: Role) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = UserClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` with a generic message for oversized,
    /// malformed, tampered or expired tokens.
    #[instrument(skip_all, name = "odyssey.auth.verify_token")]
    pub fn verify(&self, token: &str) -> Result<UserClaims, ApiError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "odyssey.auth.tokens",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum"
            );
            return Err(ApiError::Unauthorized(INVALID_TOKEN_MESSAGE.to_string()));
        }

        let data = decode::<UserClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(target: "odyssey.auth.tokens", error = %e, "Token validation failed");
            ApiError::Unauthorized(INVALID_TOKEN_MESSAGE.to_string())
        })?;

        Ok(data.claims)
    }

    /// Validate a token and resolve the caller identity.
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, ApiError> {
        let claims = self.verify(token)?;
        AuthUser::from_claims(&claims)
            .ok_or_else(|| ApiError::Unauthorized(INVALID_TOKEN_MESSAGE.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service();
        let token = tokens.issue(7, "vera", Role::Admin).unwrap();

        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.username, "vera");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_authenticate_resolves_identity() {
        let tokens = service();
        let token = tokens.issue(3, "carl", Role::User).unwrap();

        let user = tokens.authenticate(&token).unwrap();

        assert_eq!(user.id, 3);
        assert_eq!(user.username, "carl");
        assert!(!user.is_admin());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let other = TokenService::new(b"ffffffffffffffffffffffffffffffff", Duration::from_secs(60));
        let token = other.issue(1, "mallory", Role::Admin).unwrap();

        let result = service().verify(&token);

        assert!(matches!(result, Err(ApiError::Unauthorized(msg)) if msg == INVALID_TOKEN_MESSAGE));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: "1".to_string(),
            username: "vera".to_string(),
            role: Role::User,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(service().verify(&token).is_err());
    }

    #[test]
    fn test_oversized_token_is_rejected_before_parsing() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert!(matches!(
            service().verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(service().verify("not.a.jwt").is_err());
        assert!(service().verify("").is_err());
    }

    #[test]
    fn test_non_numeric_subject_is_rejected_by_authenticate() {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: "vera".to_string(),
            username: "vera".to_string(),
            role: Role::User,
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let tokens = service();
        assert!(tokens.verify(&token).is_ok());
        assert!(tokens.authenticate(&token).is_err());
    }
}
