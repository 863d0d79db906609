//! Client error types.

use common::types::FieldViolation;
use thiserror::Error;

/// Shown to users whenever the API cannot be reached.
pub const OFFLINE_MESSAGE: &str = "The server is currently offline. Please try again later.";

/// Errors returned by `ApiClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API could not be reached (connect failure, timeout, reset).
    #[error("API unreachable: {0}")]
    Offline(String),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        /// Field violations, present on validation failures.
        errors: Vec<FieldViolation>,
    },

    /// The API answered but the body was not what was expected.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Text suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            ClientError::Offline(_) => OFFLINE_MESSAGE,
            ClientError::Api { message, .. } => message,
            ClientError::Decode(_) | ClientError::Configuration(_) => {
                "An unexpected error occurred"
            }
        }
    }

    /// HTTP status of an API error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_has_uniform_message() {
        let err = ClientError::Offline("connection refused".to_string());

        assert_eq!(err.user_message(), OFFLINE_MESSAGE);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_api_error_passes_message_through() {
        let err = ClientError::Api {
            status: 404,
            message: "Star with the id: 9 not found".to_string(),
            errors: Vec::new(),
        };

        assert_eq!(err.user_message(), "Star with the id: 9 not found");
        assert_eq!(err.status(), Some(404));
    }
}
