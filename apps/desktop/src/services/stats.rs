//! Derived state reads: progress, streaks, deadlines.
//!
//! Everything here is computed from current rows on every call; nothing
//! is cached, so local edits and pulled changes show up immediately.

use studytrack_core::deadlines::{self, Deadline, ExamCountdown, DEADLINE_WINDOW_DAYS};
use studytrack_core::types::UserProfile;
use studytrack_core::{streak, NextTask};

use crate::db::{
    date_utils, ChapterRepository, ProfileRepository, ProgressSummary, StatsRepository,
    SubjectRepository, TodoChapter,
};
use crate::state::AppState;

use super::ServiceError;

/// Completion for one subject.
pub async fn subject_progress(
    state: &AppState,
    subject_id: i64,
) -> Result<ProgressSummary, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.subject_progress(subject_id).map_err(Into::into)
}

/// Completion across all subjects.
pub async fn overall_progress(state: &AppState) -> Result<ProgressSummary, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.overall_progress().map_err(Into::into)
}

/// The next part to study in a subject, videos before exercises.
pub async fn next_task(
    state: &AppState,
    subject_id: i64,
) -> Result<Option<NextTask>, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.next_task(subject_id).map_err(Into::into)
}

/// Every unfinished chapter with its subject name.
pub async fn todo_chapters(state: &AppState) -> Result<Vec<TodoChapter>, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.todo_chapters().map_err(Into::into)
}

/// Consecutive days studied, counted back from today.
pub async fn study_streak(state: &AppState) -> Result<u32, ServiceError> {
    let days = {
        let repo = state.repository.lock().expect("repository lock");
        repo.study_days()?
    };
    Ok(streak::study_streak(&days, date_utils::today_local()))
}

/// Exams, tests and chapter due dates coming up in the next few days.
pub async fn upcoming_deadlines(state: &AppState) -> Result<Vec<Deadline>, ServiceError> {
    let (subjects, chapters) = {
        let repo = state.repository.lock().expect("repository lock");
        (repo.get_all_subjects()?, repo.get_all_chapters()?)
    };
    Ok(deadlines::upcoming_deadlines(
        &subjects,
        &chapters,
        date_utils::today_local(),
        DEADLINE_WINDOW_DAYS,
    ))
}

/// Countdown to the nearest future exam.
pub async fn next_exam(state: &AppState) -> Result<Option<ExamCountdown>, ServiceError> {
    let subjects = {
        let repo = state.repository.lock().expect("repository lock");
        repo.get_all_subjects()?
    };
    Ok(deadlines::next_exam(&subjects, date_utils::today_local()))
}

/// The gamification profile.
pub async fn profile(state: &AppState) -> Result<UserProfile, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.get_profile().map_err(Into::into)
}

/// Total minutes ever logged.
pub async fn total_study_minutes(state: &AppState) -> Result<i64, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.total_study_minutes().map_err(Into::into)
}
