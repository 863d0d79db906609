//! Request body validation middleware.
//!
//! Buffers the JSON body, checks it against the resource schema for one
//! operation and hands the normalised fields to the handler as a
//! `ValidatedBody` extension. Invalid bodies are answered with 400 before
//! the handler runs.

use crate::errors::ApiError;
use crate::resources::ResourceKind;
use crate::validation::{validate_body, Operation};
use axum::{
    body::{self, Body},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};
use tracing::instrument;

/// Largest JSON body accepted on resource routes.
pub const MAX_JSON_BODY_BYTES: usize = 1024 * 1024;

/// Fields that passed validation, normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBody(pub Map<String, Value>);

/// Which schema and operation a route validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodySchema {
    pub kind: ResourceKind,
    pub operation: Operation,
}

/// Validation middleware.
#[instrument(skip_all, name = "odyssey.middleware.validate")]
pub async fn validate_request(
    State(schema): State<BodySchema>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();

    let bytes = body::to_bytes(body, MAX_JSON_BODY_BYTES)
        .await
        .map_err(|_| ApiError::BadRequest("Request body is too large or unreadable".to_string()))?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "odyssey.middleware.validate", error = %e, "Invalid JSON body");
        ApiError::BadRequest("Invalid JSON body".to_string())
    })?;

    let fields = validate_body(schema.kind, schema.operation, &value).map_err(|violations| {
        tracing::debug!(
            target: "odyssey.middleware.validate",
            violations = violations.len(),
            "Body failed validation"
        );
        ApiError::Validation(violations)
    })?;

    parts.extensions.insert(ValidatedBody(fields));
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
