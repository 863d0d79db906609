//! Odyssey API configuration.
//!
//! Configuration is loaded from environment variables. The database URL and
//! the token signing secret are redacted in Debug output.

use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Minimum length of `JWT_SECRET` in bytes (HS256 key strength).
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Default session token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 86_400;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum accepted bcrypt cost factor.
pub const MIN_BCRYPT_COST: u32 = 4;

/// Maximum accepted bcrypt cost factor.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default rate limit window (15 minutes).
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 900;

/// Default ceiling for read requests per window.
pub const DEFAULT_READ_RATE_LIMIT_MAX: u32 = 100;

/// Default ceiling for create/update/delete requests per window.
pub const DEFAULT_MUTATE_RATE_LIMIT_MAX: u32 = 20;

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default directory for uploaded files.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default graceful shutdown drain period.
pub const DEFAULT_DRAIN_SECONDS: u64 = 10;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Odyssey API configuration.
pub struct Config {
    /// Server bind address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// PostgreSQL connection URL. When absent the in-memory store is used.
    pub database_url: Option<String>,

    /// HS256 signing secret for session tokens.
    pub jwt_secret: SecretString,

    /// Session token lifetime in seconds.
    pub token_ttl_seconds: u64,

    /// Bcrypt cost factor for password hashing.
    pub bcrypt_cost: u32,

    /// Fixed rate limit window length in seconds.
    pub rate_limit_window_seconds: u64,

    /// Read requests allowed per client per window.
    pub read_rate_limit_max: u32,

    /// Mutating requests allowed per client per window.
    pub mutate_rate_limit_max: u32,

    /// Whole-request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Directory uploaded files are written to and served from.
    pub upload_dir: PathBuf,

    /// When true, the two GET routes of each resource skip authorisation.
    pub public_reads: bool,

    /// Seconds to wait for in-flight requests on shutdown.
    pub drain_seconds: u64,

    /// Log output format.
    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("rate_limit_window_seconds", &self.rate_limit_window_seconds)
            .field("read_rate_limit_max", &self.read_rate_limit_max)
            .field("mutate_rate_limit_max", &self.mutate_rate_limit_max)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("upload_dir", &self.upload_dir)
            .field("public_reads", &self.public_reads)
            .field("drain_seconds", &self.drain_seconds)
            .field("log_format", &self.log_format)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),

    #[error("Invalid bcrypt cost: {0}")]
    InvalidBcryptCost(String),

    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned();

        let jwt_secret = vars
            .get("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "JWT_SECRET must be at least {} bytes, got {}",
                MIN_JWT_SECRET_BYTES,
                jwt_secret.len()
            )));
        }
        let jwt_secret = SecretString::from(jwt_secret.as_str());

        let token_ttl_seconds =
            parse_positive(vars, "TOKEN_TTL_SECONDS", DEFAULT_TOKEN_TTL_SECONDS)?;

        let bcrypt_cost = if let Some(value_str) = vars.get("BCRYPT_COST") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&value) {
                return Err(ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be between {} and {}, got {}",
                    MIN_BCRYPT_COST, MAX_BCRYPT_COST, value
                )));
            }

            value
        } else {
            DEFAULT_BCRYPT_COST
        };

        let rate_limit_window_seconds = parse_positive(
            vars,
            "RATE_LIMIT_WINDOW_SECONDS",
            DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
        )?;
        let read_rate_limit_max =
            parse_rate_limit_max(vars, "READ_RATE_LIMIT_MAX", DEFAULT_READ_RATE_LIMIT_MAX)?;
        let mutate_rate_limit_max = parse_rate_limit_max(
            vars,
            "MUTATE_RATE_LIMIT_MAX",
            DEFAULT_MUTATE_RATE_LIMIT_MAX,
        )?;

        let request_timeout_seconds = parse_positive(
            vars,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?;

        let upload_dir = vars
            .get("UPLOAD_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));

        let public_reads = match vars
            .get("PUBLIC_READS")
            .map(|v| v.trim().to_ascii_lowercase())
        {
            None => false,
            Some(v) if v == "true" || v == "1" => true,
            Some(v) if v == "false" || v == "0" || v.is_empty() => false,
            Some(v) => {
                return Err(ConfigError::InvalidValue {
                    name: "PUBLIC_READS".to_string(),
                    reason: format!("expected true or false, got '{}'", v),
                })
            }
        };

        // Zero is allowed: skips the drain period entirely
        let drain_seconds = match vars.get("DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| ConfigError::InvalidValue {
                name: "DRAIN_SECONDS".to_string(),
                reason: format!("must be a non-negative integer, got '{}': {}", value_str, e),
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        let log_format = match vars.get("LOG_FORMAT").map(String::as_str) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Config {
            bind_address,
            database_url,
            jwt_secret,
            token_ttl_seconds,
            bcrypt_cost,
            rate_limit_window_seconds,
            read_rate_limit_max,
            mutate_rate_limit_max,
            request_timeout_seconds,
            upload_dir,
            public_reads,
            drain_seconds,
            log_format,
        })
    }

    /// Token signing secret bytes.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.expose_secret().as_bytes()
    }

    /// Rate limit window as a `Duration`.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_seconds)
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Session token lifetime as a `Duration`.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }
}

fn parse_positive(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("must be a valid positive integer, got '{}': {}", value_str, e),
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(value)
}

fn parse_rate_limit_max(
    vars: &HashMap<String, String>,
    name: &str,
    default: u32,
) -> Result<u32, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u32 = value_str.parse().map_err(|e| {
        ConfigError::InvalidRateLimit(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidRateLimit(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(value)
}
