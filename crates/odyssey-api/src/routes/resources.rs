//! Router factory for one resource kind.
//!
//! | Method | Path   | Middleware (outer to inner)            |
//! |--------|--------|----------------------------------------|
//! | GET    | `/`    | read limiter, auth                     |
//! | GET    | `/:id` | read limiter, auth                     |
//! | POST   | `/`    | mutate limiter, auth, validate create  |
//! | PUT    | `/:id` | mutate limiter, auth, validate update  |
//! | DELETE | `/:id` | mutate limiter, auth                   |
//!
//! With public reads enabled the GET routes skip auth.

use crate::controllers::ResourceController;
use crate::handlers;
use crate::middleware::{
    rate_limit, require_auth, validate_request, AuthState, BodySchema, RateLimiter,
};
use crate::validation::Operation;
use axum::{
    middleware,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use std::sync::Arc;

type ResourceRoute = MethodRouter<Arc<ResourceController>>;

/// Middleware shared by every resource router.
#[derive(Clone)]
pub struct ResourceGuards {
    pub read_limiter: Arc<RateLimiter>,
    pub mutate_limiter: Arc<RateLimiter>,
    pub auth: Arc<AuthState>,
    /// Serve GET routes without auth.
    pub public_reads: bool,
}

impl ResourceGuards {
    fn read(&self, route: ResourceRoute) -> ResourceRoute {
        let route = if self.public_reads {
            route
        } else {
            route.layer(middleware::from_fn_with_state(
                self.auth.clone(),
                require_auth,
            ))
        };
        route.layer(middleware::from_fn_with_state(
            self.read_limiter.clone(),
            rate_limit,
        ))
    }

    fn mutate(&self, route: ResourceRoute, schema: Option<BodySchema>) -> ResourceRoute {
        let route = match schema {
            Some(schema) => {
                route.layer(middleware::from_fn_with_state(schema, validate_request))
            }
            None => route,
        };
        route
            .layer(middleware::from_fn_with_state(
                self.auth.clone(),
                require_auth,
            ))
            .layer(middleware::from_fn_with_state(
                self.mutate_limiter.clone(),
                rate_limit,
            ))
    }
}

/// Build the five CRUD routes for the controller's kind, ready to nest
/// under `/api/<plural>`.
pub fn resource_router(controller: Arc<ResourceController>, guards: &ResourceGuards) -> Router {
    let kind = controller.kind();
    let create_schema = BodySchema {
        kind,
        operation: Operation::Create,
    };
    let update_schema = BodySchema {
        kind,
        operation: Operation::Update,
    };

    let collection = guards
        .read(get(handlers::list_resources))
        .merge(guards.mutate(post(handlers::create_resource), Some(create_schema)));

    let member = guards
        .read(get(handlers::get_resource))
        .merge(guards.mutate(put(handlers::update_resource), Some(update_schema)))
        .merge(guards.mutate(delete(handlers::delete_resource), None));

    Router::new()
        .route("/", collection)
        .route("/:id", member)
        .with_state(controller)
}
