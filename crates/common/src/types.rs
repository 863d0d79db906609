//! JSON envelope types for the Odyssey REST API.
//!
//! Every response body is one of: `{message}`, `{data}`, `{message, data}`,
//! `{message, errors}` for validation failures, or a bespoke payload such as
//! the token or upload responses below.

use serde::{Deserialize, Serialize};

/// Response carrying only a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Create a message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response carrying a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse<T> {
    /// The payload.
    pub data: T,
}

/// Response carrying both a message and a payload (create/update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDataResponse<T> {
    /// Human-readable message.
    pub message: String,
    /// The payload.
    pub data: T,
}

/// One violated field in a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field name as it appears on the wire (camelCase).
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldViolation {
    /// Create a violation for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 400 body listing every violated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    /// Summary message.
    pub message: String,
    /// All violations, in schema order.
    pub errors: Vec<FieldViolation>,
}

/// Fixed payload served at the base route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResponse {
    /// Base route description.
    pub message: String,
    /// API author.
    pub author: String,
}

/// Request body for `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Request body for `POST /auth/register`.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Desired username.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Response from `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The issued session token.
    pub token: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Response from `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Generated filename of the stored file.
    pub file: String,
    /// Absolute URL the file can be fetched from.
    pub path: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_response_shape() {
        let body = ValidationErrorResponse {
            message: "Validation failed".to_string(),
            errors: vec![FieldViolation::new("name", "name is required")],
        };

        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["message"], "Validation failed");
        assert_eq!(json["errors"][0]["field"], "name");
        assert_eq!(json["errors"][0]["message"], "name is required");
    }

    #[test]
    fn test_login_request_debug_redacts_password() {
        let request = LoginRequest {
            username: "vera".to_string(),
            password: "hunter22".to_string(),
        };

        let debug_str = format!("{request:?}");
        assert!(debug_str.contains("vera"));
        assert!(!debug_str.contains("hunter22"));
    }

    #[test]
    fn test_token_response_debug_redacts_token() {
        let response = TokenResponse {
            token: "eyJhbGciOiJIUzI1NiJ9.e30.sig".to_string(),
        };

        assert!(!format!("{response:?}").contains("eyJ"));
    }
}
