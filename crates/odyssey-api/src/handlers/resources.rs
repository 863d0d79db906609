//! CRUD handlers shared by every resource router.
//!
//! Each router carries its own `ResourceController` as state, so the same
//! five handlers serve all kinds.

use crate::auth::AuthUser;
use crate::controllers::ResourceController;
use crate::errors::ApiError;
use crate::middleware::ValidatedBody;
use crate::store::{Page, MAX_PAGE_LIMIT};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use common::types::{DataResponse, MessageDataResponse, MessageResponse};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Raw list query. Parsed by hand so bad values get a JSON 400.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> Result<Page, ApiError> {
        let mut page = Page::default();

        if let Some(raw) = &self.limit {
            page.limit = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|limit| (1..=MAX_PAGE_LIMIT).contains(limit))
                .ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "limit must be an integer between 1 and {MAX_PAGE_LIMIT}"
                    ))
                })?;
        }

        if let Some(raw) = &self.offset {
            page.offset = raw.trim().parse::<u64>().map_err(|_| {
                ApiError::BadRequest("offset must be a non-negative integer".to_string())
            })?;
        }

        Ok(page)
    }
}

/// Parse a path id. Ids are positive integers.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid id: {raw}")))
}

/// Handler for GET /api/<plural>
pub async fn list_resources(
    State(controller): State<Arc<ResourceController>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<DataResponse<Vec<Value>>>, ApiError> {
    let Query(query) = query.map_err(|e| {
        tracing::debug!(target: "odyssey.handlers", error = %e, "Rejected query string");
        ApiError::BadRequest("Invalid query string".to_string())
    })?;
    let data = controller.get_all(query.page()?).await?;
    Ok(Json(DataResponse { data }))
}

/// Handler for GET /api/<plural>/:id
pub async fn get_resource(
    State(controller): State<Arc<ResourceController>>,
    Path(raw_id): Path<String>,
) -> Result<Json<DataResponse<Value>>, ApiError> {
    let data = controller.get_by_id(parse_id(&raw_id)?).await?;
    Ok(Json(DataResponse { data }))
}

/// Handler for POST /api/<plural>
pub async fn create_resource(
    State(controller): State<Arc<ResourceController>>,
    caller: Option<Extension<AuthUser>>,
    Extension(ValidatedBody(fields)): Extension<ValidatedBody>,
) -> Result<(StatusCode, Json<MessageDataResponse<Value>>), ApiError> {
    let caller = caller.map(|Extension(user)| user);
    let data = controller.create(caller.as_ref(), fields).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageDataResponse {
            message: controller.created_message(),
            data,
        }),
    ))
}

/// Handler for PUT /api/<plural>/:id
pub async fn update_resource(
    State(controller): State<Arc<ResourceController>>,
    Path(raw_id): Path<String>,
    caller: Option<Extension<AuthUser>>,
    Extension(ValidatedBody(fields)): Extension<ValidatedBody>,
) -> Result<Json<MessageDataResponse<Value>>, ApiError> {
    let id = parse_id(&raw_id)?;
    let caller = caller.map(|Extension(user)| user);
    let data = controller.update(caller.as_ref(), id, fields).await?;

    Ok(Json(MessageDataResponse {
        message: controller.updated_message(id),
        data,
    }))
}

/// Handler for DELETE /api/<plural>/:id
pub async fn delete_resource(
    State(controller): State<Arc<ResourceController>>,
    Path(raw_id): Path<String>,
    caller: Option<Extension<AuthUser>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    let caller = caller.map(|Extension(user)| user);
    controller.delete(caller.as_ref(), id).await?;

    Ok(Json(MessageResponse::new(controller.deleted_message(id))))
}
