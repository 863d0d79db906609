//! Rate limiting middleware.
//!
//! Each `RateLimiter` applies one fixed-window policy. Clients are keyed by
//! identity (`user:<id>`) when the request carries a valid session token,
//! otherwise by peer address (`ip:<addr>`). A request over the ceiling gets
//! 429 with `Retry-After` and never reaches the handler.

use crate::auth::TokenService;
use crate::errors::ApiError;
use crate::middleware::auth::extract_token;
use crate::observability::metrics;
use crate::services::rate_limit::RateLimitStore;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument;

/// One rate limit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Bucket and metric label ("read", "mutate").
    pub name: &'static str,
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Looser policy for GET routes.
    pub fn read(max_requests: u32, window: Duration) -> Self {
        Self {
            name: "read",
            max_requests,
            window,
        }
    }

    /// Tighter policy for create, update, delete and the auth endpoints.
    pub fn mutate(max_requests: u32, window: Duration) -> Self {
        Self {
            name: "mutate",
            max_requests,
            window,
        }
    }
}

/// Applies a policy against a shared counter store.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
    tokens: Arc<TokenService>,
}

impl RateLimiter {
    pub fn new(
        policy: RateLimitPolicy,
        store: Arc<dyn RateLimitStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            policy,
            store,
            tokens,
        }
    }

    /// Client key for a request.
    pub fn client_key(&self, req: &Request) -> String {
        if let Some(user) =
            extract_token(req.headers()).and_then(|token| self.tokens.authenticate(token).ok())
        {
            return format!("user:{}", user.id);
        }

        match req.extensions().get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
            None => "ip:unknown".to_string(),
        }
    }

    /// Count one request for `key`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RateLimited` once the window's ceiling is passed.
    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        let now = Instant::now();
        let hit = self
            .store
            .hit(self.policy.name, key, self.policy.window, now);
        let allowed = hit.count <= self.policy.max_requests;

        metrics::record_rate_limit_decision(self.policy.name, allowed);

        if allowed {
            return Ok(());
        }

        let retry_after_secs = retry_after_secs(hit.resets_at.saturating_duration_since(now));
        tracing::debug!(
            target: "odyssey.middleware.rate_limit",
            policy = self.policy.name,
            count = hit.count,
            retry_after_secs,
            "Rate limit exceeded"
        );
        Err(ApiError::RateLimited { retry_after_secs })
    }
}

/// Whole seconds until the window resets, rounded up, at least 1.
fn retry_after_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

/// Rate limiting middleware.
#[instrument(skip_all, name = "odyssey.middleware.rate_limit")]
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = limiter.client_key(&req);
    limiter.check(&key)?;
    Ok(next.run(req).await)
}
