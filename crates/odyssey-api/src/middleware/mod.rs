//! HTTP middleware for the Odyssey API.
//!
//! Resource routes run, in order: rate limit, auth, then body validation on
//! create and update.

pub mod auth;
pub mod http_metrics;
pub mod rate_limit;
pub mod validate;

pub use auth::{require_auth, AuthState};
pub use http_metrics::http_metrics_middleware;
pub use rate_limit::{rate_limit, RateLimitPolicy, RateLimiter};
pub use validate::{validate_request, BodySchema, ValidatedBody};
