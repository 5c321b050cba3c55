//! Wire shapes for the remote tables.
//!
//! Pulled rows are parsed into typed structs; push payloads are built as
//! JSON values. Payloads never carry the server `id` column (the service
//! assigns it on insert, and updates address it through the URL), and
//! child payloads reference their parent by the parent's server id.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use studytrack_core::types::{Chapter, Semester, StudySession, Subject, UserProfile};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct SemesterRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubjectRow {
    pub id: i64,
    pub semester_id: Option<i64>,
    pub name: String,
    pub exam_date: Option<NaiveDate>,
    pub test_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChapterRow {
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
    pub video_completed: bool,
    pub exercises_completed: bool,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionRow {
    pub id: i64,
    pub subject_id: i64,
    pub duration_minutes: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileRow {
    pub xp: i64,
    pub level: i64,
    pub total_sessions: i64,
}

pub(crate) fn semester_payload(user_id: Uuid, semester: &Semester) -> Value {
    json!({
        "user_id": user_id,
        "name": semester.name,
    })
}

pub(crate) fn subject_payload(
    user_id: Uuid,
    semester_remote_id: Option<i64>,
    subject: &Subject,
) -> Value {
    json!({
        "user_id": user_id,
        "semester_id": semester_remote_id,
        "name": subject.name,
        "exam_date": subject.exam_date,
        "test_date": subject.test_date,
        "notes": subject.notes,
    })
}

pub(crate) fn chapter_payload(user_id: Uuid, subject_remote_id: i64, chapter: &Chapter) -> Value {
    json!({
        "user_id": user_id,
        "subject_id": subject_remote_id,
        "name": chapter.name,
        "video_completed": chapter.video_completed,
        "exercises_completed": chapter.exercises_completed,
        "due_date": chapter.due_date,
    })
}

pub(crate) fn session_payload(
    user_id: Uuid,
    subject_remote_id: i64,
    session: &StudySession,
) -> Value {
    json!({
        "user_id": user_id,
        "subject_id": subject_remote_id,
        "duration_minutes": session.duration_minutes,
        "timestamp": session.timestamp,
    })
}

pub(crate) fn profile_payload(user_id: Uuid, profile: &UserProfile) -> Value {
    json!({
        "user_id": user_id,
        "xp": profile.xp,
        "level": profile.level,
        "total_sessions": profile.total_sessions,
    })
}

/// Server id of a returned row.
pub(crate) fn server_id(row: &Value) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}
