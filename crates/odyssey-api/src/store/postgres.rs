//! PostgreSQL resource store.
//!
//! Each kind has its own table (named after the URL segment) with an
//! `id BIGSERIAL` key, a `data JSONB` column holding the entity fields and
//! `created_at`/`updated_at` timestamps. Updates merge with `data || $patch`.
//!
//! # Security
//!
//! - Values are always bound parameters
//! - Table names come from `ResourceKind::plural`, a closed set of literals

use super::{Page, Record, ResourceStore, StoreError};
use crate::observability::metrics;
use crate::resources::ResourceKind;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// `ResourceStore` backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgResourceStore {
    pool: PgPool,
}

impl PgResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Record the outcome of one query and pass the result through.
fn observed<T>(
    operation: &'static str,
    kind: ResourceKind,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, StoreError> {
    let outcome = if result.is_ok() { "success" } else { "error" };
    metrics::record_store_operation(operation, kind.plural(), outcome, start.elapsed());
    result.map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::conflict(kind, violated_field(kind, db.constraint()))
        }
        other => StoreError::Database(format!(
            "{} on {} failed: {}",
            operation,
            kind.plural(),
            other
        )),
    })
}

/// Unique schema field named by a violated index such as `idx_users_email`.
/// Falls back to the first unique field when the constraint is unnamed.
fn violated_field(kind: ResourceKind, constraint: Option<&str>) -> &'static str {
    let mut unique = kind.schema().iter().filter(|spec| spec.unique);
    let first = unique.clone().next().map_or("value", |spec| spec.name);
    constraint
        .and_then(|name| unique.find(|spec| name.ends_with(&format!("_{}", spec.name))))
        .map_or(first, |spec| spec.name)
}

fn map_row_to_record(row: &PgRow) -> Result<Record, sqlx::Error> {
    let Json(data): Json<Map<String, Value>> = row.try_get("data")?;
    Ok(Record {
        id: row.try_get("id")?,
        data,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    #[instrument(skip_all, name = "odyssey.store.list", fields(kind = %kind))]
    async fn list(&self, kind: ResourceKind, page: Page) -> Result<Vec<Record>, StoreError> {
        let start = Instant::now();
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            kind.plural()
        );

        let result = sqlx::query(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::try_from(page.offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .and_then(|rows| rows.iter().map(map_row_to_record).collect());

        observed("list", kind, start, result)
    }

    #[instrument(skip_all, name = "odyssey.store.get", fields(kind = %kind, id = id))]
    async fn get(&self, kind: ResourceKind, id: i64) -> Result<Option<Record>, StoreError> {
        let start = Instant::now();
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {} WHERE id = $1",
            kind.plural()
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(map_row_to_record).transpose());

        observed("get", kind, start, result)
    }

    #[instrument(skip_all, name = "odyssey.store.insert", fields(kind = %kind))]
    async fn insert(
        &self,
        kind: ResourceKind,
        data: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        let start = Instant::now();
        let sql = format!(
            r#"
            INSERT INTO {} (data)
            VALUES ($1)
            RETURNING id, data, created_at, updated_at
            "#,
            kind.plural()
        );

        let result = sqlx::query(&sql)
            .bind(Json(data))
            .fetch_one(&self.pool)
            .await
            .and_then(|row| map_row_to_record(&row));

        observed("insert", kind, start, result)
    }

    #[instrument(skip_all, name = "odyssey.store.update", fields(kind = %kind, id = id))]
    async fn update(
        &self,
        kind: ResourceKind,
        id: i64,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError> {
        let start = Instant::now();
        let sql = format!(
            r#"
            UPDATE {}
            SET data = data || $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, data, created_at, updated_at
            "#,
            kind.plural()
        );

        let result = sqlx::query(&sql)
            .bind(id) // $1
            .bind(Json(patch)) // $2
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(map_row_to_record).transpose());

        observed("update", kind, start, result)
    }

    #[instrument(skip_all, name = "odyssey.store.delete", fields(kind = %kind, id = id))]
    async fn delete(&self, kind: ResourceKind, id: i64) -> Result<bool, StoreError> {
        let start = Instant::now();
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.plural());

        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected() > 0);

        observed("delete", kind, start, result)
    }

    #[instrument(skip_all, name = "odyssey.store.find_by_field", fields(kind = %kind))]
    async fn find_by_field(
        &self,
        kind: ResourceKind,
        field: &str,
        value: &str,
    ) -> Result<Option<Record>, StoreError> {
        let start = Instant::now();
        let sql = format!(
            r#"
            SELECT id, data, created_at, updated_at
            FROM {}
            WHERE data ->> $1 = $2
            ORDER BY id
            LIMIT 1
            "#,
            kind.plural()
        );

        let result = sqlx::query(&sql)
            .bind(field) // $1
            .bind(value) // $2
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(map_row_to_record).transpose());

        observed("find_by_field", kind, start, result)
    }

    #[instrument(skip_all, name = "odyssey.store.exists", fields(kind = %kind, id = id))]
    async fn exists(&self, kind: ResourceKind, id: i64) -> Result<bool, StoreError> {
        let start = Instant::now();
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
            kind.plural()
        );

        let result = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await;

        observed("exists", kind, start, result)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
