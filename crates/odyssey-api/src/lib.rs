//! Odyssey API Library
//!
//! CRUD REST service for astronomy data (asteroids, comets, constellations,
//! galaxies, moons, nebulae, planets, stars) and user accounts.
//!
//! # Architecture
//!
//! Every resource kind gets the same five routes from one router factory:
//!
//! ```text
//! routes/resources.rs -> middleware/*.rs -> handlers/resources.rs
//!     -> controllers.rs -> store/*.rs
//! ```
//!
//! Requests pass a rate limiter, then auth, then (for create and update)
//! body validation before the controller runs.
//!
//! # Modules
//!
//! - `auth` - Session tokens, password hashing, caller identity
//! - `config` - Service configuration from environment
//! - `controllers` - Per-kind CRUD over the store
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Rate limiting, auth, validation, HTTP metrics
//! - `observability` - Prometheus metrics
//! - `resources` - Resource kinds and field schemas
//! - `routes` - Axum router setup and application state
//! - `services` - Rate limit counters and upload storage
//! - `store` - Persistence trait with PostgreSQL and in-memory backends
//! - `validation` - Body schema checks

pub mod auth;
pub mod config;
pub mod controllers;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod resources;
pub mod routes;
pub mod services;
pub mod store;
pub mod validation;
