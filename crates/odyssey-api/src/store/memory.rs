//! In-memory resource store.
//!
//! One `BTreeMap` per kind behind a single mutex. Ids start at 1 and are
//! never reused, matching a `BIGSERIAL` column. The lock is never held
//! across an await point.

use super::{Page, Record, ResourceStore, StoreError};
use crate::observability::metrics;
use crate::resources::ResourceKind;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Record>,
}

impl Table {
    /// Fail when `data` repeats a unique field value held by a record other
    /// than `own_id`.
    fn check_unique(
        &self,
        kind: ResourceKind,
        own_id: Option<i64>,
        data: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        for spec in kind.schema().iter().filter(|spec| spec.unique) {
            let Some(value) = data.get(spec.name).and_then(Value::as_str) else {
                continue;
            };
            let taken = self
                .rows
                .values()
                .filter(|record| Some(record.id) != own_id)
                .any(|record| record.text(spec.name) == Some(value));
            if taken {
                return Err(StoreError::conflict(kind, spec.name));
            }
        }
        Ok(())
    }
}

/// Process-local `ResourceStore`.
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    tables: Mutex<HashMap<ResourceKind, Table>>,
    offline: AtomicBool,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store. Every operation fails while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of records of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.tables().get(&kind).map_or(0, |table| table.rows.len())
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<ResourceKind, Table>> {
        // Recover from poisoning: no write leaves a table half-updated
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn observe<T>(
        &self,
        operation: &'static str,
        kind: ResourceKind,
        op: impl FnOnce(&mut HashMap<ResourceKind, Table>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let start = Instant::now();
        let result = self.check_online().and_then(|()| op(&mut *self.tables()));
        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::record_store_operation(operation, kind.plural(), outcome, start.elapsed());
        result
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list(&self, kind: ResourceKind, page: Page) -> Result<Vec<Record>, StoreError> {
        self.observe("list", kind, |tables| {
            Ok(tables
                .get(&kind)
                .map(|table| {
                    table
                        .rows
                        .values()
                        .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
                        .take(page.limit as usize)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    async fn get(&self, kind: ResourceKind, id: i64) -> Result<Option<Record>, StoreError> {
        self.observe("get", kind, |tables| {
            Ok(tables
                .get(&kind)
                .and_then(|table| table.rows.get(&id))
                .cloned())
        })
    }

    async fn insert(
        &self,
        kind: ResourceKind,
        data: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        self.observe("insert", kind, |tables| {
            let table = tables.entry(kind).or_default();
            table.check_unique(kind, None, &data)?;
            table.last_id += 1;
            let now = Utc::now();
            let record = Record {
                id: table.last_id,
                data,
                created_at: now,
                updated_at: now,
            };
            table.rows.insert(record.id, record.clone());
            Ok(record)
        })
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: i64,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError> {
        self.observe("update", kind, |tables| {
            let Some(table) = tables.get_mut(&kind) else {
                return Ok(None);
            };
            if !table.rows.contains_key(&id) {
                return Ok(None);
            }
            table.check_unique(kind, Some(id), &patch)?;
            Ok(table.rows.get_mut(&id).map(|record| {
                record.data.extend(patch);
                record.updated_at = Utc::now();
                record.clone()
            }))
        })
    }

    async fn delete(&self, kind: ResourceKind, id: i64) -> Result<bool, StoreError> {
        self.observe("delete", kind, |tables| {
            Ok(tables
                .get_mut(&kind)
                .is_some_and(|table| table.rows.remove(&id).is_some()))
        })
    }

    async fn find_by_field(
        &self,
        kind: ResourceKind,
        field: &str,
        value: &str,
    ) -> Result<Option<Record>, StoreError> {
        self.observe("find_by_field", kind, |tables| {
            Ok(tables.get(&kind).and_then(|table| {
                table
                    .rows
                    .values()
                    .find(|record| record.text(field) == Some(value))
                    .cloned()
            }))
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}
