//! Observability for the Odyssey API.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
