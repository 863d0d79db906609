//! Health check handlers.
//!
//! - `/health`: liveness, returns OK while the process runs
//! - `/ready`: readiness, pings the resource store

use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Body of `GET /ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// Liveness handler. Checks no dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness handler.
///
/// Returns 200 when the store answers a ping, 503 otherwise. The store error
/// is logged, never returned.
#[tracing::instrument(skip_all, name = "odyssey.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                store: "healthy",
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "odyssey.health", error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    store: "unhealthy",
                }),
            )
        }
    }
}
