//! Client configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::ClientError;

/// Base URL used when `API_BASE_URL` is unset.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the client sends requests and how long it waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin without a trailing slash.
    pub base_url: String,
    pub http_timeout: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if `API_BASE_URL` is not an
    /// http(s) URL.
    pub fn from_env() -> Result<Self, ClientError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from a map of variables.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if `API_BASE_URL` is not an
    /// http(s) URL.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ClientError> {
        let base_url = vars
            .get("API_BASE_URL")
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL);

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Configuration(format!(
                "API_BASE_URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        Ok(Self::new(base_url))
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
