//! Common test utilities for the integration suite.
//!
//! Every context runs against an in-memory SQLite store and an in-memory
//! table client, so the suite needs no network, no environment variables
//! and no cleanup. No background worker is spawned; tests drive the queue
//! with `SyncService::run_pending` so every drain is deterministic.

pub mod fixtures;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use studentpro_lib::auth::{AuthSession, AuthUser};
use studentpro_lib::config::{AppConfig, SyncMode};
use studentpro_lib::db::{OutboxRepository, SqliteRepository};
use studentpro_lib::remote::{InMemoryTableClient, RemoteConfig, Table, TableClient, TableError};
use studentpro_lib::AppState;

/// Test context wiring [`AppState`] to in-memory stores.
pub struct TestContext {
    pub state: AppState,
    pub client: Arc<InMemoryTableClient>,
}

impl TestContext {
    /// Context in automatic sync mode.
    pub fn new() -> Self {
        Self::with_mode(SyncMode::Automatic)
    }

    pub fn with_mode(mode: SyncMode) -> Self {
        let client = Arc::new(InMemoryTableClient::new());
        let state = state_with(client.clone(), mode);
        Self { state, client }
    }

    /// Put a fabricated session in place, as if sign-in had just
    /// succeeded. The opening pull still has to run before queued pushes
    /// go out.
    pub fn sign_in(&self) -> AuthUser {
        let user = test_user();
        self.state.session.set(Some(AuthSession {
            user: user.clone(),
            access_token: "test-access-token".to_string(),
            refresh_token: "test-refresh-token".to_string(),
        }));
        self.state.sync.begin_session();
        user
    }

    /// Sign in and run the session's opening pull.
    pub async fn sign_in_and_pull(&self) -> AuthUser {
        let user = self.sign_in();
        self.state.sync.pull_all().await.expect("opening pull");
        user
    }

    /// Direct access to the local store.
    pub fn repo(&self) -> MutexGuard<'_, SqliteRepository> {
        self.state.repository.lock().unwrap()
    }

    /// Queued operation count.
    pub fn pending(&self) -> i64 {
        self.repo().pending_count().expect("pending count")
    }
}

/// Build an [`AppState`] around an arbitrary table client, with a fresh
/// in-memory store and no background worker.
pub fn state_with(tables: Arc<dyn TableClient>, mode: SyncMode) -> AppState {
    let repository = SqliteRepository::open_in_memory().expect("in-memory store");
    let config = AppConfig {
        sync_mode: mode,
        ..AppConfig::default()
    };
    let remote = RemoteConfig {
        base_url: "http://localhost:54321".to_string(),
        api_key: "test-api-key".to_string(),
    };
    AppState::with_client(config, remote, repository, tables)
}

/// The identity every test signs in as.
pub fn test_user() -> AuthUser {
    AuthUser {
        id: Uuid::parse_str("5f8c1c9e-2b7a-4d7e-9a37-6d3f2c4b8a10").unwrap(),
        email: "dana@example.com".to_string(),
    }
}

/// Fabricate a session for [`test_user`] on an arbitrary state.
pub fn sign_in_on(state: &AppState) -> AuthUser {
    let user = test_user();
    state.session.set(Some(AuthSession {
        user: user.clone(),
        access_token: "test-access-token".to_string(),
        refresh_token: "test-refresh-token".to_string(),
    }));
    state.sync.begin_session();
    user
}

/// Table client standing in for an unreachable service.
///
/// Every call fails with a network error until [`go_online`] flips it to
/// the wrapped in-memory client, as if connectivity came back.
///
/// [`go_online`]: OfflineTableClient::go_online
pub struct OfflineTableClient {
    pub inner: InMemoryTableClient,
    online: AtomicBool,
}

impl OfflineTableClient {
    pub fn new() -> Self {
        Self {
            inner: InMemoryTableClient::new(),
            online: AtomicBool::new(false),
        }
    }

    pub fn go_online(&self) {
        self.online.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TableError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TableError::Network("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl TableClient for OfflineTableClient {
    async fn select(
        &self,
        table: Table,
        token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Value>, TableError> {
        self.check()?;
        self.inner.select(table, token, user_id).await
    }

    async fn insert(&self, table: Table, token: &str, record: Value) -> Result<Value, TableError> {
        self.check()?;
        self.inner.insert(table, token, record).await
    }

    async fn update(
        &self,
        table: Table,
        token: &str,
        id: i64,
        fields: Value,
    ) -> Result<(), TableError> {
        self.check()?;
        self.inner.update(table, token, id, fields).await
    }

    async fn delete(&self, table: Table, token: &str, id: i64) -> Result<(), TableError> {
        self.check()?;
        self.inner.delete(table, token, id).await
    }

    async fn upsert(
        &self,
        table: Table,
        token: &str,
        record: Value,
        on_conflict: &str,
    ) -> Result<Value, TableError> {
        self.check()?;
        self.inner.upsert(table, token, record, on_conflict).await
    }
}

/// Table client that rejects every call with 401, as a revoked or
/// expired session would be.
pub struct UnauthorizedTableClient;

fn expired() -> TableError {
    TableError::Status {
        status: 401,
        message: "JWT expired".to_string(),
    }
}

#[async_trait]
impl TableClient for UnauthorizedTableClient {
    async fn select(
        &self,
        _table: Table,
        _token: &str,
        _user_id: Uuid,
    ) -> Result<Vec<Value>, TableError> {
        Err(expired())
    }

    async fn insert(
        &self,
        _table: Table,
        _token: &str,
        _record: Value,
    ) -> Result<Value, TableError> {
        Err(expired())
    }

    async fn update(
        &self,
        _table: Table,
        _token: &str,
        _id: i64,
        _fields: Value,
    ) -> Result<(), TableError> {
        Err(expired())
    }

    async fn delete(&self, _table: Table, _token: &str, _id: i64) -> Result<(), TableError> {
        Err(expired())
    }

    async fn upsert(
        &self,
        _table: Table,
        _token: &str,
        _record: Value,
        _on_conflict: &str,
    ) -> Result<Value, TableError> {
        Err(expired())
    }
}
