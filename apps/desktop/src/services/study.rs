//! Study logging and gamification.

use chrono::Utc;
use studytrack_core::types::{StudySession, UserProfile};
use studytrack_core::XpAward;

use crate::db::{DeletedRemoteRefs, ProfileRepository, SessionRepository, SyncEntity};
use crate::state::AppState;

use super::{queue_deletes, queue_upsert, ServiceError};

/// Record a finished study session.
pub async fn log_session(
    state: &AppState,
    subject_id: i64,
    duration_minutes: i64,
) -> Result<StudySession, ServiceError> {
    let session = {
        let repo = state.repository.lock().expect("repository lock");
        repo.insert_session(subject_id, duration_minutes, Utc::now())?
    };
    queue_upsert(state, SyncEntity::StudySession, Some(session.id))?;
    Ok(session)
}

/// List every recorded session, oldest first.
pub async fn list_sessions(state: &AppState) -> Result<Vec<StudySession>, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.get_all_sessions().map_err(Into::into)
}

/// Add XP to the profile and bump the session counter. Returns the new
/// totals and whether a level boundary was crossed.
pub async fn award_xp(state: &AppState, amount: i64) -> Result<XpAward, ServiceError> {
    let award = {
        let repo = state.repository.lock().expect("repository lock");
        let mut profile = repo.get_profile()?;
        let award = studytrack_core::xp::award_xp(&mut profile, amount, 1);
        repo.save_profile(&profile)?;
        award
    };
    queue_upsert(state, SyncEntity::Profile, None)?;
    Ok(award)
}

/// Wipe all sessions and reset the profile to its starting values.
pub async fn reset_progress(state: &AppState) -> Result<(), ServiceError> {
    let removed = {
        let repo = state.repository.lock().expect("repository lock");
        let removed = repo.delete_all_sessions()?;
        repo.save_profile(&UserProfile::default())?;
        removed
    };
    let refs = DeletedRemoteRefs {
        sessions: removed,
        ..Default::default()
    };
    queue_deletes(state, &refs)?;
    queue_upsert(state, SyncEntity::Profile, None)
}
