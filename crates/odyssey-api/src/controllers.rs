//! Resource controller.
//!
//! One `ResourceController` per kind maps the five CRUD operations onto the
//! `ResourceStore`. Bodies arrive already validated; the controller adds the
//! checks that need the store or the caller:
//!
//! - referenced records must exist (400)
//! - unique fields must not collide with another record (409)
//! - user records may only be changed by their owner or an admin (403), and
//!   only admins may grant the admin role
//!
//! Password fields are hashed before they are stored and never rendered.

use crate::auth::password::hash_password_blocking;
use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::resources::{FieldKind, ResourceKind};
use crate::store::{Page, Record, ResourceStore, StoreError};
use common::jwt::Role;
use common::types::FieldViolation;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

/// CRUD operations for one resource kind.
#[derive(Clone)]
pub struct ResourceController {
    kind: ResourceKind,
    store: Arc<dyn ResourceStore>,
    bcrypt_cost: u32,
}

impl ResourceController {
    pub fn new(kind: ResourceKind, store: Arc<dyn ResourceStore>, bcrypt_cost: u32) -> Self {
        Self {
            kind,
            store,
            bcrypt_cost,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Records of this kind, rendered.
    #[instrument(skip_all, name = "odyssey.controller.get_all", fields(kind = %self.kind))]
    pub async fn get_all(&self, page: Page) -> Result<Vec<Value>, ApiError> {
        let records = self.store.list(self.kind, page).await?;
        Ok(records.iter().map(render).collect())
    }

    #[instrument(
        skip_all,
        name = "odyssey.controller.get_by_id",
        fields(kind = %self.kind, id = id)
    )]
    pub async fn get_by_id(&self, id: i64) -> Result<Value, ApiError> {
        let record = self
            .store
            .get(self.kind, id)
            .await?
            .ok_or_else(|| self.not_found(id))?;
        Ok(render(&record))
    }

    /// Store a new record. `caller` is `None` for self-registration.
    #[instrument(skip_all, name = "odyssey.controller.create", fields(kind = %self.kind))]
    pub async fn create(
        &self,
        caller: Option<&AuthUser>,
        mut fields: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        if self.kind == ResourceKind::User {
            default_role(&mut fields);
            check_role_grant(caller, &fields)?;
        }

        let fields = self.prepare(None, fields).await?;
        let record = self.store.insert(self.kind, fields).await?;

        tracing::info!(
            target: "odyssey.controller",
            kind = %self.kind,
            id = record.id,
            "Record created"
        );
        Ok(render(&record))
    }

    /// Merge `fields` into record `id`.
    #[instrument(skip_all, name = "odyssey.controller.update", fields(kind = %self.kind, id = id))]
    pub async fn update(
        &self,
        caller: Option<&AuthUser>,
        id: i64,
        mut fields: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        if self.kind == ResourceKind::User {
            check_owner(caller, id)?;
            if fields.get("role").is_some_and(Value::is_null) {
                default_role(&mut fields);
            }
            check_role_grant(caller, &fields)?;
        }

        if !self.store.exists(self.kind, id).await? {
            return Err(self.not_found(id));
        }

        let fields = self.prepare(Some(id), fields).await?;
        let record = self
            .store
            .update(self.kind, id, fields)
            .await?
            .ok_or_else(|| self.not_found(id))?;

        tracing::info!(target: "odyssey.controller", kind = %self.kind, id, "Record updated");
        Ok(render(&record))
    }

    #[instrument(skip_all, name = "odyssey.controller.delete", fields(kind = %self.kind, id = id))]
    pub async fn delete(&self, caller: Option<&AuthUser>, id: i64) -> Result<(), ApiError> {
        if self.kind == ResourceKind::User {
            check_owner(caller, id)?;
        }

        if !self.store.delete(self.kind, id).await? {
            return Err(self.not_found(id));
        }

        tracing::info!(target: "odyssey.controller", kind = %self.kind, id, "Record deleted");
        Ok(())
    }

    /// `"<Kind> successfully created"`
    pub fn created_message(&self) -> String {
        format!("{} successfully created", self.kind.display_name())
    }

    /// `"<Kind> with the id: <id> successfully updated"`
    pub fn updated_message(&self, id: i64) -> String {
        format!(
            "{} with the id: {} successfully updated",
            self.kind.display_name(),
            id
        )
    }

    /// `"<Kind> with the id: <id> successfully deleted"`
    pub fn deleted_message(&self, id: i64) -> String {
        format!(
            "{} with the id: {} successfully deleted",
            self.kind.display_name(),
            id
        )
    }

    fn not_found(&self, id: i64) -> ApiError {
        ApiError::NotFound(format!(
            "{} with the id: {} not found",
            self.kind.display_name(),
            id
        ))
    }

    /// Store-dependent checks and password hashing. `current_id` is the
    /// record being updated, which may keep its own unique values.
    async fn prepare(
        &self,
        current_id: Option<i64>,
        mut fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ApiError> {
        let mut violations = Vec::new();

        for spec in self.kind.schema() {
            let Some(value) = fields.get(spec.name) else {
                continue;
            };

            if let (FieldKind::Reference(target), Some(target_id)) = (spec.kind, value.as_i64()) {
                if !self.store.exists(target, target_id).await? {
                    violations.push(FieldViolation::new(
                        spec.name,
                        format!(
                            "{} with the id: {} does not exist",
                            target.display_name(),
                            target_id
                        ),
                    ));
                }
            }

            if spec.unique {
                if let Some(text) = value.as_str() {
                    let existing = self.store.find_by_field(self.kind, spec.name, text).await?;
                    if existing.is_some_and(|record| Some(record.id) != current_id) {
                        return Err(StoreError::conflict(self.kind, spec.name).into());
                    }
                }
            }
        }

        if !violations.is_empty() {
            return Err(ApiError::Validation(violations));
        }

        for spec in self.kind.schema() {
            if spec.kind != FieldKind::Password {
                continue;
            }
            if let Some(Value::String(plaintext)) = fields.remove(spec.name) {
                let hash = hash_password_blocking(plaintext, self.bcrypt_cost).await?;
                fields.insert(spec.name.to_string(), Value::String(hash));
            }
        }

        Ok(fields)
    }
}

/// Wire form of a record: `id`, the entity fields except passwords, and
/// `createdAt`/`updatedAt`.
pub fn render(record: &Record) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::from(record.id));
    for (key, value) in &record.data {
        if key != "password" {
            object.insert(key.clone(), value.clone());
        }
    }
    object.insert(
        "createdAt".to_string(),
        Value::String(record.created_at.to_rfc3339()),
    );
    object.insert(
        "updatedAt".to_string(),
        Value::String(record.updated_at.to_rfc3339()),
    );
    Value::Object(object)
}

fn default_role(fields: &mut Map<String, Value>) {
    let missing = fields.get("role").map_or(true, Value::is_null);
    if missing {
        fields.insert("role".to_string(), Value::from(Role::User.as_str()));
    }
}

fn check_owner(caller: Option<&AuthUser>, user_id: i64) -> Result<(), ApiError> {
    match caller {
        Some(caller) if caller.can_modify_user(user_id) => Ok(()),
        _ => Err(ApiError::Forbidden(
            "You may only modify your own account".to_string(),
        )),
    }
}

fn check_role_grant(
    caller: Option<&AuthUser>,
    fields: &Map<String, Value>,
) -> Result<(), ApiError> {
    let grants_admin = fields.get("role").and_then(Value::as_str) == Some(Role::Admin.as_str());
    if grants_admin && !caller.is_some_and(AuthUser::is_admin) {
        return Err(ApiError::Forbidden(
            "Only admins may assign the admin role".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;
    use crate::store::MemoryResourceStore;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn controller(store: &Arc<MemoryResourceStore>, kind: ResourceKind) -> ResourceController {
        ResourceController::new(kind, store.clone(), MIN_BCRYPT_COST)
    }

    /// Registration body for user "vera" with the given email.
    fn vera(email: &str) -> Map<String, Value> {
        object(json!({"username": "vera", "email": email, "password": "rubin-1928"}))
    }

    fn caller(id: i64, role: Role) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{id}"),
            role,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = Arc::new(MemoryResourceStore::new());
        let galaxies = controller(&store, ResourceKind::Galaxy);

        let created = galaxies
            .create(None, object(json!({"name": "Andromeda", "type": "spiral"})))
            .await
            .unwrap();

        assert_eq!(created["id"], 1);
        assert_eq!(created["name"], "Andromeda");
        assert!(created["createdAt"].is_string());

        let fetched = galaxies.get_by_id(1).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let store = Arc::new(MemoryResourceStore::new());
        let stars = controller(&store, ResourceKind::Star);

        let err = stars.get_by_id(9).await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound(msg) if msg == "Star with the id: 9 not found"));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = Arc::new(MemoryResourceStore::new());
        let comets = controller(&store, ResourceKind::Comet);
        comets
            .create(None, object(json!({"name": "Halley", "orbitalPeriod": 76})))
            .await
            .unwrap();

        let updated = comets
            .update(None, 1, object(json!({"lastPerihelion": "1986-02-09"})))
            .await
            .unwrap();

        assert_eq!(updated["name"], "Halley");
        assert_eq!(updated["orbitalPeriod"], 76);
        assert_eq!(updated["lastPerihelion"], "1986-02-09");
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_id_are_not_found() {
        let store = Arc::new(MemoryResourceStore::new());
        let moons = controller(&store, ResourceKind::Moon);

        assert!(matches!(
            moons.update(None, 3, object(json!({"name": "Io"}))).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            moons.delete(None, 3).await,
            Err(ApiError::NotFound(msg)) if msg == "Moon with the id: 3 not found"
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = Arc::new(MemoryResourceStore::new());
        let nebulae = controller(&store, ResourceKind::Nebula);
        nebulae
            .create(None, object(json!({"name": "Crab"})))
            .await
            .unwrap();

        nebulae.delete(None, 1).await.unwrap();

        assert_eq!(store.count(ResourceKind::Nebula), 0);
        assert_eq!(nebulae.deleted_message(1), "Nebula with the id: 1 successfully deleted");
    }

    #[tokio::test]
    async fn test_dangling_reference_is_rejected_without_write() {
        let store = Arc::new(MemoryResourceStore::new());
        let moons = controller(&store, ResourceKind::Moon);

        let err = moons
            .create(None, object(json!({"name": "Phobos", "planetId": 4})))
            .await
            .unwrap_err();

        match err {
            ApiError::Validation(violations) => {
                assert_eq!(violations[0].field, "planetId");
                assert_eq!(violations[0].message, "Planet with the id: 4 does not exist");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.count(ResourceKind::Moon), 0);
    }

    #[tokio::test]
    async fn test_existing_reference_is_accepted() {
        let store = Arc::new(MemoryResourceStore::new());
        controller(&store, ResourceKind::Planet)
            .create(None, object(json!({"name": "Mars"})))
            .await
            .unwrap();

        let moon = controller(&store, ResourceKind::Moon)
            .create(None, object(json!({"name": "Phobos", "planetId": 1})))
            .await
            .unwrap();

        assert_eq!(moon["planetId"], 1);
    }

    #[tokio::test]
    async fn test_user_password_is_hashed_and_hidden() {
        let store = Arc::new(MemoryResourceStore::new());
        let users = controller(&store, ResourceKind::User);

        let created = users.create(None, vera("vera@example.com")).await.unwrap();

        assert!(created.get("password").is_none());
        assert_eq!(created["role"], "user");

        let stored = store.get(ResourceKind::User, 1).await.unwrap().unwrap();
        let hash = stored.text("password").unwrap();
        assert_ne!(hash, "rubin-1928");
        assert!(bcrypt::verify("rubin-1928", hash).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = Arc::new(MemoryResourceStore::new());
        let users = controller(&store, ResourceKind::User);
        users.create(None, vera("vera@example.com")).await.unwrap();

        let err = users
            .create(None, vera("other@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(store.count(ResourceKind::User), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_duplicate_creates_admit_one_user() {
        let store = Arc::new(MemoryResourceStore::new());
        let users = controller(&store, ResourceKind::User);

        let (first, second) = tokio::join!(
            users.create(None, vera("vera@example.com")),
            users.create(None, vera("vera@lsst.org")),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let err = results.into_iter().find_map(Result::err).unwrap();
        match err {
            ApiError::Conflict(message) => {
                assert_eq!(message, "A user with that username already exists");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.count(ResourceKind::User), 1);
    }

    #[tokio::test]
    async fn test_user_may_keep_own_unique_values_on_update() {
        let store = Arc::new(MemoryResourceStore::new());
        let users = controller(&store, ResourceKind::User);
        users.create(None, vera("vera@example.com")).await.unwrap();

        let me = caller(1, Role::User);
        let updated = users
            .update(Some(&me), 1, object(json!({"username": "vera"})))
            .await
            .unwrap();

        assert_eq!(updated["username"], "vera");
    }

    #[tokio::test]
    async fn test_users_cannot_modify_other_accounts() {
        let store = Arc::new(MemoryResourceStore::new());
        let users = controller(&store, ResourceKind::User);
        users.create(None, vera("vera@example.com")).await.unwrap();

        let other = caller(2, Role::User);
        assert!(matches!(
            users.update(Some(&other), 1, object(json!({"username": "eve"}))).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            users.delete(Some(&other), 1).await,
            Err(ApiError::Forbidden(_))
        ));

        let admin = caller(99, Role::Admin);
        users.delete(Some(&admin), 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_only_admins_grant_admin_role() {
        let store = Arc::new(MemoryResourceStore::new());
        let users = controller(&store, ResourceKind::User);
        let body = json!({
            "username": "vera",
            "email": "vera@example.com",
            "password": "rubin-1928",
            "role": "admin"
        });

        assert!(matches!(
            users.create(Some(&caller(5, Role::User)), object(body.clone())).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            users.create(None, object(body.clone())).await,
            Err(ApiError::Forbidden(_))
        ));

        let created = users
            .create(Some(&caller(1, Role::Admin)), object(body))
            .await
            .unwrap();
        assert_eq!(created["role"], "admin");
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_database_error() {
        let store = Arc::new(MemoryResourceStore::new());
        store.set_offline(true);

        let err = controller(&store, ResourceKind::Galaxy)
            .get_all(Page::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Database(_)));
    }

    #[test]
    fn test_messages() {
        let store = Arc::new(MemoryResourceStore::new());
        let asteroids = controller(&store, ResourceKind::Asteroid);

        assert_eq!(asteroids.created_message(), "Asteroid successfully created");
        assert_eq!(
            asteroids.updated_message(3),
            "Asteroid with the id: 3 successfully updated"
        );
    }
}
