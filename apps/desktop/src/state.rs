//! Application state.

use std::sync::{Arc, Mutex};

use crate::auth::{AuthManager, SessionContext};
use crate::config::{default_session_path, AppConfig, SyncMode};
use crate::db::{DbError, SqliteRepository};
use crate::remote::{RemoteConfig, RestTableClient, TableClient};
use crate::sync::{SyncService, SyncWorker};

/// Global application state.
pub struct AppState {
    pub repository: Arc<Mutex<SqliteRepository>>,
    pub config: Mutex<AppConfig>,
    pub session: SessionContext,
    pub auth: AuthManager,
    pub sync: SyncService,
    pub worker: Option<SyncWorker>,
}

impl AppState {
    /// Open the local store and wire the engine against the hosted
    /// service. Must run on the tokio runtime; the background sync worker
    /// is spawned here.
    pub fn connect(config: AppConfig, remote: RemoteConfig) -> Result<Self, DbError> {
        // Ensure data directory exists
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let repository = SqliteRepository::open(&config.database_path)?;
        let tables: Arc<dyn TableClient> = Arc::new(RestTableClient::new(remote.clone()));
        let mut state = Self::assemble(config, remote, repository, tables);
        state.worker = Some(SyncWorker::spawn(state.sync.clone()));
        Ok(state)
    }

    /// Same wiring with a caller-supplied store and table client, and no
    /// background worker; the caller drains the queue with
    /// [`SyncService::run_pending`].
    pub fn with_client(
        config: AppConfig,
        remote: RemoteConfig,
        repository: SqliteRepository,
        tables: Arc<dyn TableClient>,
    ) -> Self {
        Self::assemble(config, remote, repository, tables)
    }

    fn assemble(
        config: AppConfig,
        remote: RemoteConfig,
        repository: SqliteRepository,
        tables: Arc<dyn TableClient>,
    ) -> Self {
        let repository = Arc::new(Mutex::new(repository));
        let session = SessionContext::new();
        let auth = AuthManager::new(remote, default_session_path(), session.clone());
        let sync = SyncService::new(tables, Arc::clone(&repository), session.clone());
        sync.set_automatic(config.sync_mode == SyncMode::Automatic);
        Self {
            repository,
            config: Mutex::new(config),
            session,
            auth,
            sync,
            worker: None,
        }
    }

    /// Switch between automatic and manual replication.
    pub fn set_sync_mode(&self, mode: SyncMode) {
        self.config.lock().expect("config lock").sync_mode = mode;
        self.sync.set_automatic(mode == SyncMode::Automatic);
        if mode == SyncMode::Automatic {
            self.sync.nudge();
        }
    }

    /// Whether mutations should queue automatic pushes right now.
    pub(crate) fn auto_sync(&self) -> bool {
        self.session.is_signed_in()
            && self.config.lock().expect("config lock").sync_mode == SyncMode::Automatic
    }
}
