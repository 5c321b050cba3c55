//! Session lifecycle and manual sync actions.

use tracing::warn;

use crate::auth::AuthUser;
use crate::db::{LocalSyncState, SyncStateRepository};
use crate::state::AppState;
use crate::sync::{PullStats, PushStats};

use super::ServiceError;

/// Sign in and run the session's opening pull.
///
/// A failed pull does not fail sign-in: the engine keeps serving local
/// data and the pull can be repeated with [`download_all`].
pub async fn sign_in(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<AuthUser, ServiceError> {
    let user = state.auth.sign_in(email, password).await?;
    state.sync.begin_session();
    if let Err(e) = state.sync.pull_all().await {
        warn!(error = %e, "opening pull failed");
    }
    Ok(user)
}

/// Register an account. `None` means the service wants the email address
/// confirmed before it issues a session.
pub async fn sign_up(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Option<AuthUser>, ServiceError> {
    let user = state.auth.sign_up(email, password).await?;
    if user.is_some() {
        state.sync.begin_session();
        if let Err(e) = state.sync.pull_all().await {
            warn!(error = %e, "opening pull failed");
        }
    }
    Ok(user)
}

/// Sign out and drop session-scoped sync state. Local rows are kept.
pub async fn sign_out(state: &AppState) -> Result<(), ServiceError> {
    state.auth.sign_out().await?;
    state.sync.end_session();
    Ok(())
}

/// Resume the persisted session, if any, and run the opening pull.
pub async fn restore(state: &AppState) -> Result<Option<AuthUser>, ServiceError> {
    let user = state.auth.restore_session().await?;
    if user.is_some() {
        state.sync.begin_session();
        if let Err(e) = state.sync.pull_all().await {
            warn!(error = %e, "opening pull failed");
        }
    }
    Ok(user)
}

/// Push the full local dataset, including rows whose automatic push never
/// happened.
pub async fn upload_all(state: &AppState) -> Result<PushStats, ServiceError> {
    state.sync.push_all().await.map_err(Into::into)
}

/// Fetch and merge the full remote dataset.
pub async fn download_all(state: &AppState) -> Result<PullStats, ServiceError> {
    state.sync.pull_all().await.map_err(Into::into)
}

/// Last pull time and queued push count.
pub async fn sync_state(state: &AppState) -> Result<LocalSyncState, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.get_sync_state().map_err(Into::into)
}
