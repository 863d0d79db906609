//! HTTP request handlers for the Odyssey API.

pub mod auth;
pub mod health;
pub mod metrics;
pub mod resources;
pub mod root;
pub mod upload;

pub use auth::{login, logout, me, register};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use resources::{
    create_resource, delete_resource, get_resource, list_resources, update_resource,
};
pub use root::{api_identity, method_not_allowed, route_not_found};
pub use upload::upload_file;

use crate::errors::ApiError;
use serde::de::DeserializeOwned;

/// Parse a JSON request body, answering malformed input with a JSON 400.
pub(crate) fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::debug!(target: "odyssey.handlers", error = %e, "Rejected request body");
        ApiError::BadRequest("Invalid JSON body".to_string())
    })
}
