//! Common utilities and types shared across Odyssey components.
//!
//! The API server, the typed client, and the test utilities all speak the
//! same JSON envelopes and agree on the session cookie and token claims.
//! Those shared contracts live here.

#![warn(clippy::pedantic)]

/// Module for token claims and size limits
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for the browser session cookie contract
pub mod session;

/// Module for JSON envelope types shared by server and client
pub mod types;
