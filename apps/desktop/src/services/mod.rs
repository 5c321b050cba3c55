//! Service facade over the engine.
//!
//! Plain async functions a UI shell wires to its IPC layer. Every mutation
//! commits to the local store first; replication is queued as a side
//! effect and never blocks or fails the call.

pub mod planner;
pub mod session;
pub mod stats;
pub mod study;

use crate::auth::AuthError;
use crate::db::{DbError, DeletedRemoteRefs, OutboxRepository, SyncEntity, SyncOp};
use crate::state::AppState;
use crate::sync::SyncError;

/// Facade errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Queue a push for one row when automatic sync is on.
pub(crate) fn queue_upsert(
    state: &AppState,
    entity: SyncEntity,
    local_id: Option<i64>,
) -> Result<(), ServiceError> {
    if !state.auto_sync() {
        return Ok(());
    }
    {
        let repo = state.repository.lock().expect("repository lock");
        repo.enqueue(entity, SyncOp::Upsert, local_id, None)?;
    }
    state.sync.nudge();
    Ok(())
}

/// Queue remote deletes for rows removed by a local cascade, children
/// before parents. Deletes are queued whenever a user is signed in, even
/// in manual mode, so a later upload can clear the remote copies. The
/// queue is session-scoped: deletes still pending at sign-out are
/// abandoned and the remote rows survive.
pub(crate) fn queue_deletes(
    state: &AppState,
    refs: &DeletedRemoteRefs,
) -> Result<(), ServiceError> {
    if !state.session.is_signed_in() {
        return Ok(());
    }
    {
        let repo = state.repository.lock().expect("repository lock");
        for id in &refs.sessions {
            repo.enqueue(SyncEntity::StudySession, SyncOp::Delete, None, Some(*id))?;
        }
        for id in &refs.chapters {
            repo.enqueue(SyncEntity::Chapter, SyncOp::Delete, None, Some(*id))?;
        }
        for id in &refs.subjects {
            repo.enqueue(SyncEntity::Subject, SyncOp::Delete, None, Some(*id))?;
        }
        for id in &refs.semesters {
            repo.enqueue(SyncEntity::Semester, SyncOp::Delete, None, Some(*id))?;
        }
    }
    state.sync.nudge();
    Ok(())
}
