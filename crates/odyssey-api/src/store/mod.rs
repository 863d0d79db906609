//! Persistence collaborator for resource records.
//!
//! The controller only talks to `ResourceStore`. Two implementations ship:
//!
//! - `PgResourceStore` - PostgreSQL, one JSONB table per resource kind
//! - `MemoryResourceStore` - process-local maps, used when no database is
//!   configured and by the test harness

mod memory;
mod postgres;

pub use memory::MemoryResourceStore;
pub use postgres::PgResourceStore;

use crate::errors::ApiError;
use crate::resources::ResourceKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Largest page a list request may ask for.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A stored resource record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Store-generated identifier, positive and immutable.
    pub id: i64,
    /// Entity fields keyed by wire name.
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// String value of a field, if present.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

/// Pagination window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: MAX_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Store failures. `Conflict` surfaces as 409; the others as a sanitized 500.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field already holds the value on another record.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Conflict on unique field `field` of `kind`.
    pub fn conflict(kind: ResourceKind, field: &str) -> Self {
        StoreError::Conflict(format!(
            "A {} with that {} already exists",
            kind.display_name().to_lowercase(),
            field
        ))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::Database(other.to_string()),
        }
    }
}

/// CRUD operations over resource records.
///
/// Implementations own id generation and timestamps. `update` merges the
/// given fields into the stored record; fields absent from the patch are
/// left untouched. `insert` and `update` enforce unique schema fields
/// atomically and fail with `StoreError::Conflict`.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Records of `kind` ordered by id.
    async fn list(&self, kind: ResourceKind, page: Page) -> Result<Vec<Record>, StoreError>;

    /// One record, or `None` if the id is unknown.
    async fn get(&self, kind: ResourceKind, id: i64) -> Result<Option<Record>, StoreError>;

    /// Insert a record and return it with its generated id.
    async fn insert(
        &self,
        kind: ResourceKind,
        data: Map<String, Value>,
    ) -> Result<Record, StoreError>;

    /// Merge `patch` into a record. `None` if the id is unknown.
    async fn update(
        &self,
        kind: ResourceKind,
        id: i64,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError>;

    /// Hard-delete a record. `false` if the id is unknown.
    async fn delete(&self, kind: ResourceKind, id: i64) -> Result<bool, StoreError>;

    /// First record whose string field `field` equals `value`.
    async fn find_by_field(
        &self,
        kind: ResourceKind,
        field: &str,
        value: &str,
    ) -> Result<Option<Record>, StoreError>;

    /// Whether a record with `id` exists.
    async fn exists(&self, kind: ResourceKind, id: i64) -> Result<bool, StoreError> {
        Ok(self.get(kind, id).await?.is_some())
    }

    /// Connectivity check backing `/ready`.
    async fn ping(&self) -> Result<(), StoreError>;
}
