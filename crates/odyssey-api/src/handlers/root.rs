//! Base route and fallback.

use crate::errors::ApiError;
use axum::{http::StatusCode, Json};
use common::types::{IdentityResponse, MessageResponse};

/// Message served at `GET /`.
pub const BASE_URL_MESSAGE: &str = "This is the base url for the Odyssey REST API";

/// Author served at `GET /`.
pub const AUTHOR: &str = "Samuel Batchelor";

/// Handler for GET /
pub async fn api_identity() -> Json<IdentityResponse> {
    Json(IdentityResponse {
        message: BASE_URL_MESSAGE.to_string(),
        author: AUTHOR.to_string(),
    })
}

/// JSON 404 for paths no route matches.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// JSON 405 for known paths hit with an unsupported method.
pub async fn method_not_allowed() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(MessageResponse::new("Method not allowed")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_identity_payload() {
        let Json(body) = api_identity().await;

        assert_eq!(body.message, "This is the base url for the Odyssey REST API");
        assert_eq!(body.author, "Samuel Batchelor");
    }

    #[tokio::test]
    async fn test_fallback_is_not_found() {
        let response = route_not_found().await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_fallback_is_json() {
        let (status, Json(body)) = method_not_allowed().await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body.message, "Method not allowed");
    }
}
