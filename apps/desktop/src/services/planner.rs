//! Planner operations: semesters, subjects and chapters.

use chrono::NaiveDate;
use studytrack_core::types::{Chapter, Semester, Subject, Subtask};

use crate::db::{ChapterRepository, SemesterRepository, SubjectRepository, SyncEntity};
use crate::state::AppState;

use super::{queue_deletes, queue_upsert, ServiceError};

/// Create a semester.
pub async fn add_semester(state: &AppState, name: &str) -> Result<Semester, ServiceError> {
    let semester = {
        let repo = state.repository.lock().expect("repository lock");
        repo.insert_semester(name)?
    };
    queue_upsert(state, SyncEntity::Semester, Some(semester.id))?;
    Ok(semester)
}

/// List all semesters.
pub async fn list_semesters(state: &AppState) -> Result<Vec<Semester>, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.get_all_semesters().map_err(Into::into)
}

/// Delete a semester and everything under it.
pub async fn delete_semester(state: &AppState, id: i64) -> Result<(), ServiceError> {
    let refs = {
        let repo = state.repository.lock().expect("repository lock");
        repo.delete_semester(id)?
    };
    queue_deletes(state, &refs)
}

/// Create a subject in a semester.
pub async fn add_subject(
    state: &AppState,
    semester_id: i64,
    name: &str,
) -> Result<Subject, ServiceError> {
    let subject = {
        let repo = state.repository.lock().expect("repository lock");
        repo.insert_subject(semester_id, name)?
    };
    queue_upsert(state, SyncEntity::Subject, Some(subject.id))?;
    Ok(subject)
}

/// List all subjects.
pub async fn list_subjects(state: &AppState) -> Result<Vec<Subject>, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.get_all_subjects().map_err(Into::into)
}

/// List the subjects of one semester.
pub async fn subjects_for_semester(
    state: &AppState,
    semester_id: i64,
) -> Result<Vec<Subject>, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.get_subjects_by_semester(semester_id).map_err(Into::into)
}

/// Save a subject's name, dates and notes.
pub async fn update_subject(state: &AppState, subject: &Subject) -> Result<(), ServiceError> {
    {
        let repo = state.repository.lock().expect("repository lock");
        repo.update_subject(subject)?;
    }
    queue_upsert(state, SyncEntity::Subject, Some(subject.id))
}

/// Delete a subject and everything under it.
pub async fn delete_subject(state: &AppState, id: i64) -> Result<(), ServiceError> {
    let refs = {
        let repo = state.repository.lock().expect("repository lock");
        repo.delete_subject(id)?
    };
    queue_deletes(state, &refs)
}

/// Create a chapter for a subject.
pub async fn add_chapter(
    state: &AppState,
    subject_id: i64,
    name: &str,
    due_date: Option<NaiveDate>,
) -> Result<Chapter, ServiceError> {
    let chapter = {
        let repo = state.repository.lock().expect("repository lock");
        repo.insert_chapter(subject_id, name, due_date)?
    };
    queue_upsert(state, SyncEntity::Chapter, Some(chapter.id))?;
    Ok(chapter)
}

/// List a subject's chapters in creation order.
pub async fn chapters_for_subject(
    state: &AppState,
    subject_id: i64,
) -> Result<Vec<Chapter>, ServiceError> {
    let repo = state.repository.lock().expect("repository lock");
    repo.get_chapters_by_subject(subject_id).map_err(Into::into)
}

/// Mark one part of a chapter done or not done. Completion is recomputed
/// and the updated chapter returned.
pub async fn set_chapter_subtask(
    state: &AppState,
    id: i64,
    part: Subtask,
    done: bool,
) -> Result<Chapter, ServiceError> {
    let chapter = {
        let repo = state.repository.lock().expect("repository lock");
        repo.set_chapter_subtask(id, part, done)?
    };
    queue_upsert(state, SyncEntity::Chapter, Some(chapter.id))?;
    Ok(chapter)
}

/// Delete a chapter.
pub async fn delete_chapter(state: &AppState, id: i64) -> Result<(), ServiceError> {
    let refs = {
        let repo = state.repository.lock().expect("repository lock");
        repo.delete_chapter(id)?
    };
    queue_deletes(state, &refs)
}
