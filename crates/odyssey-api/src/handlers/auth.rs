//! Account handlers: register, login, logout and the current user.
//!
//! # Security
//!
//! - Login failures return one generic message whether the username or the
//!   password was wrong, and unknown usernames still pay for a bcrypt verify
//! - Registration cannot set a role; new accounts are always `user`
//! - The session token is returned in the body and as an `HttpOnly` cookie

use crate::auth::password::verify_password_blocking;
use crate::auth::AuthUser;
use crate::controllers::{render, ResourceController};
use crate::errors::ApiError;
use crate::handlers::parse_json;
use crate::middleware::ValidatedBody;
use crate::resources::ResourceKind;
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use common::jwt::Role;
use common::session::{expired_session_cookie, session_cookie};
use common::types::{DataResponse, FieldViolation, LoginRequest, MessageResponse, TokenResponse};
use std::sync::Arc;
use tracing::instrument;

/// Message for every failed login.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Handler for POST /auth/register
///
/// The body has already passed user validation.
#[instrument(skip_all, name = "odyssey.auth.register")]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(ValidatedBody(fields)): Extension<ValidatedBody>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if fields.contains_key("role") {
        return Err(ApiError::Validation(vec![FieldViolation::new(
            "role",
            "role cannot be set at registration",
        )]));
    }

    let users = ResourceController::new(
        ResourceKind::User,
        state.store.clone(),
        state.config.bcrypt_cost,
    );
    let user = users.create(None, fields).await?;

    tracing::info!(
        target: "odyssey.auth",
        user_id = user.get("id").and_then(serde_json::Value::as_i64),
        "User registered"
    );
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User successfully registered")),
    ))
}

/// Handler for POST /auth/login
#[instrument(skip_all, name = "odyssey.auth.login")]
pub async fn login(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    let request: LoginRequest = parse_json(&body)?;
    let username = request.username.trim();

    let user = state
        .store
        .find_by_field(ResourceKind::User, "username", username)
        .await?;

    let stored_hash = user
        .as_ref()
        .and_then(|record| record.text("password"))
        .unwrap_or(state.dummy_hash.as_str())
        .to_string();
    let password_ok = verify_password_blocking(request.password, stored_hash).await?;

    let user = match user {
        Some(user) if password_ok => user,
        _ => {
            tracing::debug!(target: "odyssey.auth", "Login rejected");
            return Err(ApiError::Unauthorized(
                INVALID_CREDENTIALS_MESSAGE.to_string(),
            ));
        }
    };

    let role = user
        .text("role")
        .and_then(|role| role.parse::<Role>().ok())
        .unwrap_or_default();
    let stored_username = user.text("username").unwrap_or(username);
    let token = state.tokens.issue(user.id, stored_username, role)?;

    tracing::info!(target: "odyssey.auth", user_id = user.id, "User logged in");
    Ok((
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(TokenResponse { token }),
    )
        .into_response())
}

/// Handler for POST /auth/logout
///
/// Tokens are not revocable; logout clears the browser cookie.
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(MessageResponse::new("Successfully logged out")),
    )
}

/// Handler for GET /auth/me
#[instrument(skip_all, name = "odyssey.auth.me")]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<DataResponse<serde_json::Value>>, ApiError> {
    let record = state
        .store
        .get(ResourceKind::User, caller.id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("User with the id: {} not found", caller.id))
        })?;

    Ok(Json(DataResponse {
        data: render(&record),
    }))
}
