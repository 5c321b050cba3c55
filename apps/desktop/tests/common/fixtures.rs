//! Factory functions for remote rows and local-day timestamps.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

/// Remote semester row body. `InMemoryTableClient::seed` assigns the id.
pub fn remote_semester(user_id: Uuid, name: &str) -> Value {
    json!({ "user_id": user_id, "name": name })
}

/// Remote subject row body referencing its semester by server id.
pub fn remote_subject(user_id: Uuid, semester_id: Option<i64>, name: &str) -> Value {
    json!({
        "user_id": user_id,
        "semester_id": semester_id,
        "name": name,
        "exam_date": null,
        "test_date": null,
        "notes": "",
    })
}

/// Remote chapter row body referencing its subject by server id.
pub fn remote_chapter(
    user_id: Uuid,
    subject_id: i64,
    name: &str,
    video: bool,
    exercises: bool,
) -> Value {
    json!({
        "user_id": user_id,
        "subject_id": subject_id,
        "name": name,
        "video_completed": video,
        "exercises_completed": exercises,
        "due_date": null,
    })
}

/// Remote study session row body.
pub fn remote_session(
    user_id: Uuid,
    subject_id: i64,
    duration_minutes: i64,
    timestamp: DateTime<Utc>,
) -> Value {
    json!({
        "user_id": user_id,
        "subject_id": subject_id,
        "duration_minutes": duration_minutes,
        "timestamp": timestamp,
    })
}

/// Remote profile row body.
pub fn remote_profile(user_id: Uuid, xp: i64, level: i64, total_sessions: i64) -> Value {
    json!({
        "user_id": user_id,
        "xp": xp,
        "level": level,
        "total_sessions": total_sessions,
    })
}

/// Noon in the local timezone on `date`, as a stored timestamp.
///
/// Sessions seeded this way land on `date` when bucketed by local
/// calendar day, whatever the machine's timezone.
pub fn local_noon(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(12, 0, 0).unwrap();
    Local
        .from_local_datetime(&naive)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}
