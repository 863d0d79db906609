//! File upload handler.
//!
//! Accepts one multipart field named `file` of at most 5 MB. The size is
//! enforced while the field streams in, so an oversized file is rejected
//! before anything is written to disk.

use crate::errors::ApiError;
use crate::routes::AppState;
use crate::services::uploads::MAX_UPLOAD_BYTES;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderMap},
    Json,
};
use common::types::UploadResponse;
use std::sync::Arc;
use tracing::instrument;

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// A file read from the request, not yet stored.
struct PendingFile {
    name: Option<String>,
    bytes: Vec<u8>,
}

/// Handler for POST /upload
#[instrument(skip_all, name = "odyssey.upload")]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(target: "odyssey.upload", error = %e, "Rejected upload body");
        ApiError::BadRequest("Expected a multipart/form-data body".to_string())
    })?;

    let mut pending: Option<PendingFile> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().map(str::to_string);
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                tracing::debug!(target: "odyssey.upload", "Upload exceeds size limit");
                return Err(ApiError::BadRequest(
                    "File exceeds the 5 MB size limit".to_string(),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        // Browsers send an empty part for an untouched file input
        if bytes.is_empty() && name.as_deref().map_or(true, str::is_empty) {
            continue;
        }

        if pending.is_some() {
            return Err(ApiError::BadRequest(
                "Only one file may be uploaded per request".to_string(),
            ));
        }
        pending = Some(PendingFile { name, bytes });
    }

    let file = pending.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    let stored = state
        .uploads
        .store(file.name.as_deref(), &file.bytes)
        .await?;

    let path = format!("{}/uploads/{}", public_origin(&headers), stored);
    Ok(Json(UploadResponse { file: stored, path }))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    tracing::debug!(target: "odyssey.upload", error = %err, "Malformed multipart body");
    ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
}

/// `scheme://host` the client used to reach the server.
fn public_origin(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|proto| *proto == "http" || *proto == "https")
        .unwrap_or("http");

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|host| !host.is_empty())
        .unwrap_or("localhost");

    format!("{scheme}://{host}")
}
