//! Test utilities for the Odyssey API.
//!
//! - `TestOdysseyServer` spawns the real router on a random port, backed by
//!   the in-memory store (or a `#[sqlx::test]` pool) and a temporary upload
//!   directory
//! - Helpers seed users and mint session tokens

pub mod server_harness;

pub use server_harness::{TestOdysseyServer, TEST_JWT_SECRET, TEST_PASSWORD};
