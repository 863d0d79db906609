//! Session token claims shared by the API and its test utilities.
//!
//! Tokens are HS256-signed JWTs issued at login. The API validates them on
//! every protected request; the test utilities forge them directly to
//! exercise expiry and tampering paths.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The `sub` and `username` fields are redacted in Debug output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical session tokens are well under 400 bytes. Anything larger is
/// rejected before base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default session lifetime (24 hours), matching the session cookie.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(86_400);

/// Role carried by a user account and its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account. May only modify its own user record.
    #[default]
    User,
    /// Administrator. May modify any user record.
    Admin,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Claims carried by an Odyssey session token.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject (user id as a decimal string) - redacted in Debug output.
    pub sub: String,

    /// Username at the time of issue - redacted in Debug output.
    pub username: String,

    /// Role at the time of issue.
    pub role: Role,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,
}

impl fmt::Debug for UserClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserClaims")
            .field("sub", &"[REDACTED]")
            .field("username", &"[REDACTED]")
            .field("role", &self.role)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .finish()
    }
}

impl UserClaims {
    /// Parse the numeric user id out of `sub`.
    ///
    /// Returns `None` when `sub` is not a positive integer.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse::<i64>().ok().filter(|id| *id > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> UserClaims {
        UserClaims {
            sub: sub.to_string(),
            username: "vera".to_string(),
            role: Role::User,
            exp: 1_700_086_400,
            iat: 1_700_000_000,
        }
    }

    #[test]
    fn test_claims_debug_redacts_identity() {
        let debug_str = format!("{:?}", claims("42"));

        assert!(!debug_str.contains("42"));
        assert!(!debug_str.contains("vera"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_user_id_parses_positive_integers_only() {
        assert_eq!(claims("42").user_id(), Some(42));
        assert_eq!(claims("0").user_id(), None);
        assert_eq!(claims("-3").user_id(), None);
        assert_eq!(claims("abc").user_id(), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");

        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_role_from_str_rejects_unknown() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("root".parse::<Role>(), Err(UnknownRole("root".to_string())));
    }

    #[test]
    fn test_max_jwt_size_constant() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }
}
