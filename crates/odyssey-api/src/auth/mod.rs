//! Authentication for the Odyssey API.
//!
//! - `tokens` - HS256 session token issuing and validation
//! - `password` - bcrypt hashing
//!
//! `AuthUser` is the caller identity attached to a request by the auth
//! middleware.

pub mod password;
pub mod tokens;

pub use tokens::TokenService;

use common::jwt::{Role, UserClaims};
use std::fmt;

/// Authenticated caller.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    /// Redacted in Debug output.
    pub username: String,
    pub role: Role,
}

impl fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthUser")
            .field("id", &self.id)
            .field("username", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

impl AuthUser {
    /// Identity carried by validated claims. `None` if `sub` is not a user id.
    pub fn from_claims(claims: &UserClaims) -> Option<Self> {
        Some(Self {
            id: claims.user_id()?,
            username: claims.username.clone(),
            role: claims.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this caller may modify the user record `user_id`.
    pub fn can_modify_user(&self, user_id: i64) -> bool {
        self.is_admin() || self.id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: Role) -> AuthUser {
        AuthUser {
            id,
            username: "vera".to_string(),
            role,
        }
    }

    #[test]
    fn test_users_may_modify_only_themselves() {
        let caller = user(4, Role::User);
        assert!(caller.can_modify_user(4));
        assert!(!caller.can_modify_user(5));
    }

    #[test]
    fn test_admins_may_modify_anyone() {
        let caller = user(1, Role::Admin);
        assert!(caller.can_modify_user(1));
        assert!(caller.can_modify_user(99));
    }

    #[test]
    fn test_debug_redacts_username() {
        let debug_str = format!("{:?}", user(4, Role::User));
        assert!(!debug_str.contains("vera"));
        assert!(debug_str.contains("id: 4"));
    }
}
