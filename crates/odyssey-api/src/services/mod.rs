//! Services used by handlers and middleware.

pub mod rate_limit;
pub mod uploads;
