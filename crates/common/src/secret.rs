//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used across Odyssey for passwords,
//! the token signing secret, and issued bearer tokens. `SecretString`
//! implements `Debug` with redaction, so structs that derive `Debug` while
//! holding a secret stay safe to log.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginAttempt {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let attempt = LoginAttempt {
//!     username: "vera".to_string(),
//!     password: SecretString::from("hunter22"),
//! };
//!
//! assert!(!format!("{attempt:?}").contains("hunter22"));
//! assert_eq!(attempt.password.expose_secret(), "hunter22");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
