//! Authentication middleware for protected routes.
//!
//! Takes the session token from the `Authorization: Bearer` header or, when
//! that is absent, the `token` cookie. A valid token attaches an `AuthUser`
//! to the request extensions for handlers and later middleware.

use crate::auth::TokenService;
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use common::session::token_from_cookie_header;
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
}

/// Session token carried by a request, if any.
///
/// The bearer header wins over the cookie when both are present.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .find_map(token_from_cookie_header)
    })
}

/// Authentication middleware that validates session tokens.
///
/// # Response
///
/// - 401 with `WWW-Authenticate` if the token is missing or invalid
/// - Otherwise continues with `AuthUser` in the request extensions
#[instrument(skip_all, name = "odyssey.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers()).ok_or_else(|| {
        tracing::debug!(target: "odyssey.middleware.auth", "Missing session token");
        ApiError::Unauthorized("Authentication required".to_string())
    })?;

    let user = state.tokens.authenticate(token)?;

    tracing::debug!(target: "odyssey.middleware.auth", user_id = user.id, "Caller authenticated");
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
