//! Test server harness for E2E testing
//!
//! Provides `TestOdysseyServer` for spawning real Odyssey API instances in
//! tests.

use common::jwt::Role;
use odyssey_api::auth::AuthUser;
use odyssey_api::config::Config;
use odyssey_api::controllers::ResourceController;
use odyssey_api::observability::metrics::detached_metrics_handle;
use odyssey_api::resources::ResourceKind;
use odyssey_api::routes::{self, AppState};
use odyssey_api::services::rate_limit::MemoryRateLimitStore;
use odyssey_api::store::{MemoryResourceStore, PgResourceStore, ResourceStore};
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Signing secret used by every test server.
pub const TEST_JWT_SECRET: &str = "odyssey-test-secret-0123456789abcdef";

/// Password given to users seeded with `create_user`.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Test harness for spawning the Odyssey API in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_root() -> Result<()> {
///     let server = TestOdysseyServer::spawn().await?;
///
///     let response = reqwest::get(server.url()).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestOdysseyServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    memory_store: Option<Arc<MemoryResourceStore>>,
    rate_limits: Arc<MemoryRateLimitStore>,
    upload_dir: TempDir,
    _handle: JoinHandle<()>,
}

impl TestOdysseyServer {
    /// Spawn a server on the in-memory store with default test settings.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(&[]).await
    }

    /// Spawn a server on the in-memory store, overriding config variables.
    ///
    /// # Arguments
    /// * `overrides` - Environment-style variables applied over the defaults
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let store = Arc::new(MemoryResourceStore::new());
        Self::start(store.clone(), Some(store), overrides).await
    }

    /// Spawn a server backed by PostgreSQL (typically a `#[sqlx::test]` pool).
    pub async fn spawn_with_pool(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::start(Arc::new(PgResourceStore::new(pool)), None, &[]).await
    }

    async fn start(
        store: Arc<dyn ResourceStore>,
        memory_store: Option<Arc<MemoryResourceStore>>,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let upload_dir = tempfile::tempdir()
            .map_err(|e| anyhow::anyhow!("Failed to create upload dir: {}", e))?;

        // Build configuration for test environment
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
            ("BCRYPT_COST".to_string(), "4".to_string()),
            ("DRAIN_SECONDS".to_string(), "0".to_string()),
            (
                "UPLOAD_DIR".to_string(),
                upload_dir.path().to_string_lossy().into_owned(),
            ),
        ]);
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let rate_limits = Arc::new(MemoryRateLimitStore::new());
        let state = AppState::new(config, store, rate_limits.clone())
            .map_err(|e| anyhow::anyhow!("Failed to build app state: {}", e))?;
        let state = Arc::new(state);

        // Build routes using the real route builder; the global recorder is
        // not installed per test server
        let app = routes::build_routes(state.clone(), detached_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            memory_store,
            rate_limits,
            upload_dir,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Shared application state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// The in-memory store, when the server was spawned without a pool.
    pub fn memory_store(&self) -> Option<&Arc<MemoryResourceStore>> {
        self.memory_store.as_ref()
    }

    /// Rate limit counters, for seeding or resetting between requests.
    pub fn rate_limits(&self) -> &MemoryRateLimitStore {
        &self.rate_limits
    }

    /// Directory uploads are written to.
    pub fn upload_dir(&self) -> &Path {
        self.upload_dir.path()
    }

    /// Mint a session token without going through login.
    pub fn token_for(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
    ) -> Result<String, anyhow::Error> {
        self.state
            .tokens
            .issue(user_id, username, role)
            .map_err(|e| anyhow::anyhow!("Failed to issue token: {}", e))
    }

    /// Store a user with `TEST_PASSWORD` and return its id and a token.
    pub async fn create_user(
        &self,
        username: &str,
        role: Role,
    ) -> Result<(i64, String), anyhow::Error> {
        let users = ResourceController::new(
            ResourceKind::User,
            self.state.store.clone(),
            self.state.config.bcrypt_cost,
        );
        let seeder = AuthUser {
            id: 0,
            username: "seeder".to_string(),
            role: Role::Admin,
        };

        let fields: Map<String, Value> = match json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": TEST_PASSWORD,
            "role": role.as_str(),
        }) {
            Value::Object(fields) => fields,
            _ => unreachable!("json! object literal"),
        };

        let user = users
            .create(Some(&seeder), fields)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create user: {}", e))?;
        let id = user["id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("Created user has no id"))?;

        Ok((id, self.token_for(id, username, role)?))
    }

    /// Store a record of `kind` directly, bypassing HTTP.
    pub async fn seed(&self, kind: ResourceKind, data: Value) -> Result<i64, anyhow::Error> {
        let Value::Object(fields) = data else {
            anyhow::bail!("Seed data must be a JSON object");
        };
        let record = self
            .state
            .store
            .insert(kind, fields)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed {}: {}", kind, e))?;
        Ok(record.id)
    }
}

impl Drop for TestOdysseyServer {
    fn drop(&mut self) {
        // Abort the server task so the port is released when the test ends
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestOdysseyServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_overrides_reach_config() -> Result<(), anyhow::Error> {
        let server = TestOdysseyServer::spawn_with(&[("MUTATE_RATE_LIMIT_MAX", "3")]).await?;

        assert_eq!(server.config().mutate_rate_limit_max, 3);
        assert_eq!(server.config().upload_dir, server.upload_dir());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_returns_working_token() -> Result<(), anyhow::Error> {
        let server = TestOdysseyServer::spawn().await?;
        let (id, token) = server.create_user("vera", Role::User).await?;

        let response = reqwest::Client::new()
            .get(format!("{}/auth/me", server.url()))
            .bearer_auth(&token)
            .send()
            .await?;
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await?;
        assert_eq!(body["data"]["id"], id);
        assert_eq!(body["data"]["username"], "vera");
        assert!(body["data"].get("password").is_none());

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_server_spawns_with_pool(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestOdysseyServer::spawn_with_pool(pool).await?;

        let response = reqwest::get(format!("{}/ready", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert!(server.memory_store().is_none());

        Ok(())
    }
}
