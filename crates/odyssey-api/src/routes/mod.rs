//! HTTP routes for the Odyssey API.
//!
//! Defines the application state and the top-level Axum router.

mod resources;

pub use resources::{resource_router, ResourceGuards};

use crate::auth::password::dummy_hash;
use crate::auth::TokenService;
use crate::config::Config;
use crate::controllers::ResourceController;
use crate::errors::ApiError;
use crate::handlers;
use crate::middleware::{
    http_metrics_middleware, rate_limit, require_auth, validate_request, AuthState, BodySchema,
    RateLimitPolicy, RateLimiter,
};
use crate::resources::ResourceKind;
use crate::services::rate_limit::RateLimitStore;
use crate::services::uploads::{UploadStorage, MAX_UPLOAD_BYTES};
use crate::store::ResourceStore;
use crate::validation::Operation;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

/// Headroom over the file ceiling for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Resource persistence.
    pub store: Arc<dyn ResourceStore>,

    /// Session token issuing and validation.
    pub tokens: Arc<TokenService>,

    /// Counters for both rate limit policies.
    pub rate_limits: Arc<dyn RateLimitStore>,

    /// Upload file storage.
    pub uploads: UploadStorage,

    /// Bcrypt hash at the configured cost, verified for unknown usernames.
    pub dummy_hash: String,
}

impl AppState {
    /// Build state from config and injected collaborators.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if the login timing hash cannot be built.
    pub fn new(
        config: Config,
        store: Arc<dyn ResourceStore>,
        rate_limits: Arc<dyn RateLimitStore>,
    ) -> Result<Self, ApiError> {
        let tokens = Arc::new(TokenService::new(
            config.jwt_secret_bytes(),
            config.token_ttl(),
        ));
        let uploads = UploadStorage::new(config.upload_dir.clone());
        let dummy_hash = dummy_hash(config.bcrypt_cost)?;

        Ok(Self {
            config,
            store,
            tokens,
            rate_limits,
            uploads,
            dummy_hash,
        })
    }

    fn limiter(&self, policy: RateLimitPolicy) -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(
            policy,
            self.rate_limits.clone(),
            self.tokens.clone(),
        ))
    }
}

/// Build the application routes.
///
/// - `/` - API identity (public)
/// - `/health`, `/ready`, `/metrics` - operational endpoints (public)
/// - `/auth/register`, `/auth/login` - mutate limiter
/// - `/auth/logout` - public
/// - `/auth/me` - read limiter, auth
/// - `/upload` - mutate limiter, auth
/// - `/uploads/*` - stored files
/// - `/api/<plural>` - CRUD routes for every resource kind
///
/// Unmatched paths get a JSON 404 and unsupported methods a JSON 405.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let config = &state.config;
    let window = config.rate_limit_window();
    let read_limiter = state.limiter(RateLimitPolicy::read(config.read_rate_limit_max, window));
    let mutate_limiter =
        state.limiter(RateLimitPolicy::mutate(config.mutate_rate_limit_max, window));
    let auth_state = Arc::new(AuthState {
        tokens: state.tokens.clone(),
    });

    let guards = ResourceGuards {
        read_limiter: read_limiter.clone(),
        mutate_limiter: mutate_limiter.clone(),
        auth: auth_state.clone(),
        public_reads: config.public_reads,
    };

    let read_limited = middleware::from_fn_with_state(read_limiter, rate_limit);
    let mutate_limited = middleware::from_fn_with_state(mutate_limiter, rate_limit);
    let authenticated = middleware::from_fn_with_state(auth_state, require_auth);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::api_identity))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/auth/logout", post(handlers::logout))
        .route(
            "/auth/register",
            post(handlers::register)
                .layer(middleware::from_fn_with_state(
                    BodySchema {
                        kind: ResourceKind::User,
                        operation: Operation::Create,
                    },
                    validate_request,
                ))
                .layer(mutate_limited.clone()),
        )
        .route(
            "/auth/login",
            post(handlers::login).layer(mutate_limited.clone()),
        )
        .with_state(state.clone());

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route(
            "/auth/me",
            get(handlers::me)
                .layer(authenticated.clone())
                .layer(read_limited),
        )
        .route(
            "/upload",
            post(handlers::upload_file)
                .layer(DefaultBodyLimit::max(
                    MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES,
                ))
                .layer(authenticated)
                .layer(mutate_limited),
        )
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let mut app = public_routes
        .merge(protected_routes)
        .merge(metrics_routes)
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()));

    for kind in ResourceKind::ALL {
        let controller = Arc::new(ResourceController::new(
            kind,
            state.store.clone(),
            config.bcrypt_cost,
        ));
        app = app.nest(
            &format!("/api/{}", kind.plural()),
            resource_router(controller, &guards),
        );
    }

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - bound stalled requests (innermost)
    // 2. TraceLayer - log request details
    // 3. http_metrics_middleware - record ALL responses (outermost)
    // Applies to every route registered above, nested ones included
    app.method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::route_not_found)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
