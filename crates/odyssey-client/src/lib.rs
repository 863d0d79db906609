//! Typed HTTP client for the Odyssey API.
//!
//! Used by front-end processes that proxy to the API. Every call returns a
//! `ClientError` on failure; network failures collapse into
//! `ClientError::Offline` so callers can show one uniform message.
//!
//! # Example
//!
//! ```rust,ignore
//! use odyssey_client::{ApiClient, ClientConfig};
//!
//! let mut client = ApiClient::new(ClientConfig::from_env()?)?;
//! client.login("henrietta", "cepheid-variables").await?;
//! let stars = client.list("stars").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, OFFLINE_MESSAGE};
