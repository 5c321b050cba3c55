//! Repository pattern for database access.

use crate::db::date_utils;
use crate::db::error::DbError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use studytrack_core::progress;
use studytrack_core::types::{Chapter, Semester, StudySession, Subject, Subtask, UserProfile};
use studytrack_core::NextTask;

type Result<T> = std::result::Result<T, DbError>;

/// Repository for semester operations.
pub trait SemesterRepository {
    fn insert_semester(&self, name: &str) -> Result<Semester>;
    fn get_semester(&self, id: i64) -> Result<Option<Semester>>;
    fn get_all_semesters(&self) -> Result<Vec<Semester>>;
    fn delete_semester(&self, id: i64) -> Result<DeletedRemoteRefs>;
    fn set_semester_remote_id(&self, id: i64, remote_id: i64) -> Result<()>;
    fn upsert_semester_from_remote(&self, remote_id: i64, name: &str) -> Result<i64>;
}

/// Repository for subject operations.
pub trait SubjectRepository {
    fn insert_subject(&self, semester_id: i64, name: &str) -> Result<Subject>;
    fn get_subject(&self, id: i64) -> Result<Option<Subject>>;
    fn get_all_subjects(&self) -> Result<Vec<Subject>>;
    fn get_subjects_by_semester(&self, semester_id: i64) -> Result<Vec<Subject>>;
    fn update_subject(&self, subject: &Subject) -> Result<()>;
    fn delete_subject(&self, id: i64) -> Result<DeletedRemoteRefs>;
    fn set_subject_remote_id(&self, id: i64, remote_id: i64) -> Result<()>;
    fn upsert_subject_from_remote(
        &self,
        remote_id: i64,
        semester_id: Option<i64>,
        name: &str,
        exam_date: Option<NaiveDate>,
        test_date: Option<NaiveDate>,
        notes: &str,
    ) -> Result<i64>;
}

/// Repository for chapter operations.
pub trait ChapterRepository {
    fn insert_chapter(&self, subject_id: i64, name: &str, due_date: Option<NaiveDate>)
        -> Result<Chapter>;
    fn get_chapter(&self, id: i64) -> Result<Option<Chapter>>;
    fn get_chapters_by_subject(&self, subject_id: i64) -> Result<Vec<Chapter>>;
    fn get_all_chapters(&self) -> Result<Vec<Chapter>>;
    fn set_chapter_subtask(&self, id: i64, part: Subtask, done: bool) -> Result<Chapter>;
    fn delete_chapter(&self, id: i64) -> Result<DeletedRemoteRefs>;
    fn set_chapter_remote_id(&self, id: i64, remote_id: i64) -> Result<()>;
    fn upsert_chapter_from_remote(
        &self,
        remote_id: i64,
        subject_id: i64,
        name: &str,
        video_completed: bool,
        exercises_completed: bool,
        due_date: Option<NaiveDate>,
    ) -> Result<i64>;
}

/// Repository for study session operations.
pub trait SessionRepository {
    fn insert_session(
        &self,
        subject_id: i64,
        duration_minutes: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<StudySession>;
    fn get_session(&self, id: i64) -> Result<Option<StudySession>>;
    fn get_all_sessions(&self) -> Result<Vec<StudySession>>;
    fn delete_all_sessions(&self) -> Result<Vec<i64>>;
    fn set_session_remote_id(&self, id: i64, remote_id: i64) -> Result<()>;
    fn upsert_session_from_remote(
        &self,
        remote_id: i64,
        subject_id: i64,
        duration_minutes: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<i64>;
}

/// Repository for the gamification profile.
pub trait ProfileRepository {
    fn get_profile(&self) -> Result<UserProfile>;
    fn save_profile(&self, profile: &UserProfile) -> Result<()>;
}

/// Entity kinds tracked by the sync queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntity {
    Semester,
    Subject,
    Chapter,
    StudySession,
    Profile,
}

impl SyncEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semester => "semester",
            Self::Subject => "subject",
            Self::Chapter => "chapter",
            Self::StudySession => "study_session",
            Self::Profile => "profile",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "semester" => Some(Self::Semester),
            "subject" => Some(Self::Subject),
            "chapter" => Some(Self::Chapter),
            "study_session" => Some(Self::StudySession),
            "profile" => Some(Self::Profile),
            _ => None,
        }
    }
}

/// Queued operation kinds. Pushes are convergent: an upsert sends the
/// current row state whether or not the row has been created remotely yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOp {
    Upsert,
    Delete,
}

impl SyncOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "upsert" => Some(Self::Upsert),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Queued remote operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OutboxItem {
    pub id: i64,
    pub entity: SyncEntity,
    pub op: SyncOp,
    pub local_id: Option<i64>,
    pub remote_id: Option<i64>,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
}

/// Remote ids captured before a cascading delete, so the matching remote
/// rows can be removed children-first.
#[derive(Debug, Clone, Default)]
pub struct DeletedRemoteRefs {
    pub semesters: Vec<i64>,
    pub subjects: Vec<i64>,
    pub chapters: Vec<i64>,
    pub sessions: Vec<i64>,
}

/// Local sync metadata.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LocalSyncState {
    pub last_pull_at: Option<DateTime<Utc>>,
    pub pending_pushes: i64,
}

/// Repository for the durable push queue.
pub trait OutboxRepository {
    fn enqueue(
        &self,
        entity: SyncEntity,
        op: SyncOp,
        local_id: Option<i64>,
        remote_id: Option<i64>,
    ) -> Result<i64>;
    fn next_due(&self, now: DateTime<Utc>) -> Result<Option<OutboxItem>>;
    fn complete_item(&self, id: i64) -> Result<()>;
    fn reschedule_item(&self, id: i64, next_attempt_at: DateTime<Utc>) -> Result<()>;
    fn pending_items(&self) -> Result<Vec<OutboxItem>>;
    fn pending_count(&self) -> Result<i64>;
    fn clear_outbox(&self) -> Result<()>;
}

/// Repository for sync metadata.
pub trait SyncStateRepository {
    fn get_sync_state(&self) -> Result<LocalSyncState>;
    fn set_last_pull(&self, at: DateTime<Utc>) -> Result<()>;
}

/// Subtask progress for one subject or the whole store.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressSummary {
    pub completed_subtasks: u64,
    pub total_subtasks: u64,
    pub percent: u8,
}

impl ProgressSummary {
    /// Summarize loaded chapters.
    pub fn from_chapters(chapters: &[Chapter]) -> Self {
        let completed: u64 = chapters.iter().map(Chapter::subtasks_done).sum();
        let total = chapters.len() as u64 * 2;
        Self {
            completed_subtasks: completed,
            total_subtasks: total,
            percent: progress::percent(completed, total),
        }
    }
}

/// Incomplete chapter with its subject name, for the dashboard todo list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TodoChapter {
    pub chapter_id: i64,
    pub chapter_name: String,
    pub subject_name: String,
    pub subtask: Subtask,
}

/// Repository for derived statistics.
pub trait StatsRepository {
    fn subject_progress(&self, subject_id: i64) -> Result<ProgressSummary>;
    fn overall_progress(&self) -> Result<ProgressSummary>;
    fn next_task(&self, subject_id: i64) -> Result<Option<NextTask>>;
    fn todo_chapters(&self) -> Result<Vec<TodoChapter>>;
    fn study_days(&self) -> Result<Vec<NaiveDate>>;
    fn total_study_minutes(&self) -> Result<i64>;
}

/// SQLite implementation of repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(super::schema::PRAGMAS)?;
        self.conn.execute_batch(super::schema::SCHEMA)?;
        self.conn.execute_batch(super::schema::INIT_USER_PROFILE)?;
        self.conn.execute_batch(super::schema::INIT_SYNC_STATE)?;
        self.repair_orphan_subjects()?;
        Ok(())
    }

    /// Adopt subjects whose semester is gone into a default "Semester 1".
    ///
    /// Runs only when an orphan actually exists, so a fresh store stays
    /// empty.
    fn repair_orphan_subjects(&self) -> Result<()> {
        let orphans: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM subjects WHERE semester_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        if orphans == 0 {
            return Ok(());
        }

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM semesters WHERE name = ?1 ORDER BY id LIMIT 1",
                params!["Semester 1"],
                |row| row.get(0),
            )
            .optional()?;
        let semester_id = match existing {
            Some(id) => id,
            None => {
                self.conn.execute(
                    "INSERT INTO semesters (name) VALUES (?1)",
                    params!["Semester 1"],
                )?;
                self.conn.last_insert_rowid()
            }
        };

        self.conn.execute(
            "UPDATE subjects SET semester_id = ?1 WHERE semester_id IS NULL",
            params![semester_id],
        )?;
        Ok(())
    }

    fn row_to_semester(row: &rusqlite::Row<'_>) -> rusqlite::Result<Semester> {
        Ok(Semester {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            name: row.get(2)?,
        })
    }

    fn row_to_subject(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subject> {
        Ok(Subject {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            semester_id: row.get(2)?,
            name: row.get(3)?,
            exam_date: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| date_utils::parse_date(&s)),
            test_date: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| date_utils::parse_date(&s)),
            notes: row.get(6)?,
        })
    }

    fn row_to_chapter(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chapter> {
        Ok(Chapter {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            subject_id: row.get(2)?,
            name: row.get(3)?,
            video_completed: row.get(4)?,
            exercises_completed: row.get(5)?,
            is_completed: row.get(6)?,
            due_date: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| date_utils::parse_date(&s)),
        })
    }

    fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudySession> {
        let raw: String = row.get(4)?;
        let timestamp = date_utils::parse_timestamp(&raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("bad timestamp: {raw}").into(),
            )
        })?;
        Ok(StudySession {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            subject_id: row.get(2)?,
            duration_minutes: row.get(3)?,
            timestamp,
        })
    }

    fn row_to_outbox(row: &rusqlite::Row<'_>) -> rusqlite::Result<OutboxItem> {
        let entity_raw: String = row.get(1)?;
        let entity = SyncEntity::from_str(&entity_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown entity: {entity_raw}").into(),
            )
        })?;
        let op_raw: String = row.get(2)?;
        let op = SyncOp::from_str(&op_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown op: {op_raw}").into(),
            )
        })?;
        let at_raw: String = row.get(6)?;
        let next_attempt_at = date_utils::parse_timestamp(&at_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                format!("bad timestamp: {at_raw}").into(),
            )
        })?;
        Ok(OutboxItem {
            id: row.get(0)?,
            entity,
            op,
            local_id: row.get(3)?,
            remote_id: row.get(4)?,
            attempts: row.get(5)?,
            next_attempt_at,
        })
    }

    fn remote_ids(&self, sql: &str, id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl SemesterRepository for SqliteRepository {
    fn insert_semester(&self, name: &str) -> Result<Semester> {
        self.conn
            .execute("INSERT INTO semesters (name) VALUES (?1)", params![name])?;
        Ok(Semester {
            id: self.conn.last_insert_rowid(),
            remote_id: None,
            name: name.to_string(),
        })
    }

    fn get_semester(&self, id: i64) -> Result<Option<Semester>> {
        self.conn
            .query_row(
                "SELECT id, remote_id, name FROM semesters WHERE id = ?1",
                params![id],
                Self::row_to_semester,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_all_semesters(&self) -> Result<Vec<Semester>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, remote_id, name FROM semesters ORDER BY id")?;
        let semesters = stmt
            .query_map([], Self::row_to_semester)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(semesters)
    }

    fn delete_semester(&self, id: i64) -> Result<DeletedRemoteRefs> {
        let refs = DeletedRemoteRefs {
            semesters: self.remote_ids(
                "SELECT remote_id FROM semesters WHERE id = ?1 AND remote_id IS NOT NULL",
                id,
            )?,
            subjects: self.remote_ids(
                "SELECT remote_id FROM subjects WHERE semester_id = ?1 AND remote_id IS NOT NULL",
                id,
            )?,
            chapters: self.remote_ids(
                "SELECT c.remote_id FROM chapters c
                 JOIN subjects s ON c.subject_id = s.id
                 WHERE s.semester_id = ?1 AND c.remote_id IS NOT NULL",
                id,
            )?,
            sessions: self.remote_ids(
                "SELECT ss.remote_id FROM study_sessions ss
                 JOIN subjects s ON ss.subject_id = s.id
                 WHERE s.semester_id = ?1 AND ss.remote_id IS NOT NULL",
                id,
            )?,
        };

        let deleted = self
            .conn
            .execute("DELETE FROM semesters WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::NotFound {
                entity: "semester",
                id,
            });
        }
        Ok(refs)
    }

    fn set_semester_remote_id(&self, id: i64, remote_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE semesters SET remote_id = ?1 WHERE id = ?2",
            params![remote_id, id],
        )?;
        Ok(())
    }

    fn upsert_semester_from_remote(&self, remote_id: i64, name: &str) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM semesters WHERE remote_id = ?1",
                params![remote_id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE semesters SET name = ?1 WHERE id = ?2",
                    params![name, id],
                )?;
                Ok(id)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO semesters (remote_id, name) VALUES (?1, ?2)",
                    params![remote_id, name],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }
}

impl SubjectRepository for SqliteRepository {
    fn insert_subject(&self, semester_id: i64, name: &str) -> Result<Subject> {
        self.conn.execute(
            "INSERT INTO subjects (semester_id, name) VALUES (?1, ?2)",
            params![semester_id, name],
        )?;
        Ok(Subject {
            id: self.conn.last_insert_rowid(),
            remote_id: None,
            semester_id: Some(semester_id),
            name: name.to_string(),
            exam_date: None,
            test_date: None,
            notes: String::new(),
        })
    }

    fn get_subject(&self, id: i64) -> Result<Option<Subject>> {
        self.conn
            .query_row(
                "SELECT id, remote_id, semester_id, name, exam_date, test_date, notes
                 FROM subjects WHERE id = ?1",
                params![id],
                Self::row_to_subject,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_all_subjects(&self) -> Result<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, remote_id, semester_id, name, exam_date, test_date, notes
             FROM subjects ORDER BY id",
        )?;
        let subjects = stmt
            .query_map([], Self::row_to_subject)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subjects)
    }

    fn get_subjects_by_semester(&self, semester_id: i64) -> Result<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, remote_id, semester_id, name, exam_date, test_date, notes
             FROM subjects WHERE semester_id = ?1 ORDER BY id",
        )?;
        let subjects = stmt
            .query_map(params![semester_id], Self::row_to_subject)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subjects)
    }

    fn update_subject(&self, subject: &Subject) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE subjects SET semester_id = ?1, name = ?2, exam_date = ?3, test_date = ?4, notes = ?5
             WHERE id = ?6",
            params![
                subject.semester_id,
                subject.name,
                subject.exam_date.map(|d| d.to_string()),
                subject.test_date.map(|d| d.to_string()),
                subject.notes,
                subject.id
            ],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound {
                entity: "subject",
                id: subject.id,
            });
        }
        Ok(())
    }

    fn delete_subject(&self, id: i64) -> Result<DeletedRemoteRefs> {
        let refs = DeletedRemoteRefs {
            semesters: Vec::new(),
            subjects: self.remote_ids(
                "SELECT remote_id FROM subjects WHERE id = ?1 AND remote_id IS NOT NULL",
                id,
            )?,
            chapters: self.remote_ids(
                "SELECT remote_id FROM chapters WHERE subject_id = ?1 AND remote_id IS NOT NULL",
                id,
            )?,
            sessions: self.remote_ids(
                "SELECT remote_id FROM study_sessions WHERE subject_id = ?1 AND remote_id IS NOT NULL",
                id,
            )?,
        };

        let deleted = self
            .conn
            .execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::NotFound {
                entity: "subject",
                id,
            });
        }
        Ok(refs)
    }

    fn set_subject_remote_id(&self, id: i64, remote_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE subjects SET remote_id = ?1 WHERE id = ?2",
            params![remote_id, id],
        )?;
        Ok(())
    }

    fn upsert_subject_from_remote(
        &self,
        remote_id: i64,
        semester_id: Option<i64>,
        name: &str,
        exam_date: Option<NaiveDate>,
        test_date: Option<NaiveDate>,
        notes: &str,
    ) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM subjects WHERE remote_id = ?1",
                params![remote_id],
                |row| row.get(0),
            )
            .optional()?;
        let exam = exam_date.map(|d| d.to_string());
        let test = test_date.map(|d| d.to_string());
        match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE subjects SET semester_id = ?1, name = ?2, exam_date = ?3, test_date = ?4, notes = ?5
                     WHERE id = ?6",
                    params![semester_id, name, exam, test, notes, id],
                )?;
                Ok(id)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO subjects (remote_id, semester_id, name, exam_date, test_date, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![remote_id, semester_id, name, exam, test, notes],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }
}

impl ChapterRepository for SqliteRepository {
    fn insert_chapter(
        &self,
        subject_id: i64,
        name: &str,
        due_date: Option<NaiveDate>,
    ) -> Result<Chapter> {
        self.conn.execute(
            "INSERT INTO chapters (subject_id, name, due_date) VALUES (?1, ?2, ?3)",
            params![subject_id, name, due_date.map(|d| d.to_string())],
        )?;
        Ok(Chapter {
            id: self.conn.last_insert_rowid(),
            remote_id: None,
            subject_id,
            name: name.to_string(),
            video_completed: false,
            exercises_completed: false,
            is_completed: false,
            due_date,
        })
    }

    fn get_chapter(&self, id: i64) -> Result<Option<Chapter>> {
        self.conn
            .query_row(
                "SELECT id, remote_id, subject_id, name, video_completed, exercises_completed, is_completed, due_date
                 FROM chapters WHERE id = ?1",
                params![id],
                Self::row_to_chapter,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_chapters_by_subject(&self, subject_id: i64) -> Result<Vec<Chapter>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, remote_id, subject_id, name, video_completed, exercises_completed, is_completed, due_date
             FROM chapters WHERE subject_id = ?1 ORDER BY id",
        )?;
        let chapters = stmt
            .query_map(params![subject_id], Self::row_to_chapter)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chapters)
    }

    fn get_all_chapters(&self) -> Result<Vec<Chapter>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, remote_id, subject_id, name, video_completed, exercises_completed, is_completed, due_date
             FROM chapters ORDER BY id",
        )?;
        let chapters = stmt
            .query_map([], Self::row_to_chapter)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chapters)
    }

    fn set_chapter_subtask(&self, id: i64, part: Subtask, done: bool) -> Result<Chapter> {
        let mut chapter = self.get_chapter(id)?.ok_or(DbError::NotFound {
            entity: "chapter",
            id,
        })?;
        chapter.set_subtask(part, done);
        self.conn.execute(
            "UPDATE chapters SET video_completed = ?1, exercises_completed = ?2, is_completed = ?3
             WHERE id = ?4",
            params![
                chapter.video_completed,
                chapter.exercises_completed,
                chapter.is_completed,
                id
            ],
        )?;
        Ok(chapter)
    }

    fn delete_chapter(&self, id: i64) -> Result<DeletedRemoteRefs> {
        let refs = DeletedRemoteRefs {
            chapters: self.remote_ids(
                "SELECT remote_id FROM chapters WHERE id = ?1 AND remote_id IS NOT NULL",
                id,
            )?,
            ..Default::default()
        };

        let deleted = self
            .conn
            .execute("DELETE FROM chapters WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::NotFound {
                entity: "chapter",
                id,
            });
        }
        Ok(refs)
    }

    fn set_chapter_remote_id(&self, id: i64, remote_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE chapters SET remote_id = ?1 WHERE id = ?2",
            params![remote_id, id],
        )?;
        Ok(())
    }

    fn upsert_chapter_from_remote(
        &self,
        remote_id: i64,
        subject_id: i64,
        name: &str,
        video_completed: bool,
        exercises_completed: bool,
        due_date: Option<NaiveDate>,
    ) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM chapters WHERE remote_id = ?1",
                params![remote_id],
                |row| row.get(0),
            )
            .optional()?;
        let is_completed = video_completed && exercises_completed;
        let due = due_date.map(|d| d.to_string());
        match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE chapters SET subject_id = ?1, name = ?2, video_completed = ?3,
                        exercises_completed = ?4, is_completed = ?5, due_date = ?6
                     WHERE id = ?7",
                    params![subject_id, name, video_completed, exercises_completed, is_completed, due, id],
                )?;
                Ok(id)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO chapters (remote_id, subject_id, name, video_completed, exercises_completed, is_completed, due_date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![remote_id, subject_id, name, video_completed, exercises_completed, is_completed, due],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }
}

impl SessionRepository for SqliteRepository {
    fn insert_session(
        &self,
        subject_id: i64,
        duration_minutes: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<StudySession> {
        self.conn.execute(
            "INSERT INTO study_sessions (subject_id, duration_minutes, timestamp) VALUES (?1, ?2, ?3)",
            params![subject_id, duration_minutes, timestamp.to_rfc3339()],
        )?;
        Ok(StudySession {
            id: self.conn.last_insert_rowid(),
            remote_id: None,
            subject_id,
            duration_minutes,
            timestamp,
        })
    }

    fn get_session(&self, id: i64) -> Result<Option<StudySession>> {
        self.conn
            .query_row(
                "SELECT id, remote_id, subject_id, duration_minutes, timestamp
                 FROM study_sessions WHERE id = ?1",
                params![id],
                Self::row_to_session,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_all_sessions(&self) -> Result<Vec<StudySession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, remote_id, subject_id, duration_minutes, timestamp
             FROM study_sessions ORDER BY id",
        )?;
        let sessions = stmt
            .query_map([], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn delete_all_sessions(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT remote_id FROM study_sessions WHERE remote_id IS NOT NULL")?;
        let remote = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.conn.execute("DELETE FROM study_sessions", [])?;
        Ok(remote)
    }

    fn set_session_remote_id(&self, id: i64, remote_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE study_sessions SET remote_id = ?1 WHERE id = ?2",
            params![remote_id, id],
        )?;
        Ok(())
    }

    fn upsert_session_from_remote(
        &self,
        remote_id: i64,
        subject_id: i64,
        duration_minutes: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM study_sessions WHERE remote_id = ?1",
                params![remote_id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE study_sessions SET subject_id = ?1, duration_minutes = ?2, timestamp = ?3
                     WHERE id = ?4",
                    params![subject_id, duration_minutes, timestamp.to_rfc3339(), id],
                )?;
                Ok(id)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO study_sessions (remote_id, subject_id, duration_minutes, timestamp)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![remote_id, subject_id, duration_minutes, timestamp.to_rfc3339()],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }
}

impl ProfileRepository for SqliteRepository {
    fn get_profile(&self) -> Result<UserProfile> {
        self.conn
            .query_row(
                "SELECT xp, level, total_sessions FROM user_profile WHERE id = 1",
                [],
                |row| {
                    Ok(UserProfile {
                        xp: row.get(0)?,
                        level: row.get(1)?,
                        total_sessions: row.get(2)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.conn.execute(
            "UPDATE user_profile SET xp = ?1, level = ?2, total_sessions = ?3 WHERE id = 1",
            params![profile.xp, profile.level, profile.total_sessions],
        )?;
        Ok(())
    }
}

impl OutboxRepository for SqliteRepository {
    fn enqueue(
        &self,
        entity: SyncEntity,
        op: SyncOp,
        local_id: Option<i64>,
        remote_id: Option<i64>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO outbox (entity, op, local_id, remote_id, attempts, next_attempt_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                entity.as_str(),
                op.as_str(),
                local_id,
                remote_id,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn next_due(&self, now: DateTime<Utc>) -> Result<Option<OutboxItem>> {
        self.conn
            .query_row(
                "SELECT id, entity, op, local_id, remote_id, attempts, next_attempt_at
                 FROM outbox WHERE next_attempt_at <= ?1 ORDER BY id LIMIT 1",
                params![now.to_rfc3339()],
                Self::row_to_outbox,
            )
            .optional()
            .map_err(Into::into)
    }

    fn complete_item(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM outbox WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn reschedule_item(&self, id: i64, next_attempt_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE outbox SET attempts = attempts + 1, next_attempt_at = ?1 WHERE id = ?2",
            params![next_attempt_at.to_rfc3339(), id],
        )?;
        Ok(())
    }

    fn pending_items(&self) -> Result<Vec<OutboxItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity, op, local_id, remote_id, attempts, next_attempt_at
             FROM outbox ORDER BY id",
        )?;
        let items = stmt
            .query_map([], Self::row_to_outbox)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn pending_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM outbox", [], |row| row.get(0))
            .map_err(Into::into)
    }

    fn clear_outbox(&self) -> Result<()> {
        self.conn.execute("DELETE FROM outbox", [])?;
        Ok(())
    }
}

impl SyncStateRepository for SqliteRepository {
    fn get_sync_state(&self) -> Result<LocalSyncState> {
        let last_pull_at: Option<String> = self.conn.query_row(
            "SELECT last_pull_at FROM sync_state WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(LocalSyncState {
            last_pull_at: last_pull_at.as_deref().and_then(date_utils::parse_timestamp),
            pending_pushes: self.pending_count()?,
        })
    }

    fn set_last_pull(&self, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_state SET last_pull_at = ?1 WHERE id = 1",
            params![at.to_rfc3339()],
        )?;
        Ok(())
    }
}

impl StatsRepository for SqliteRepository {
    fn subject_progress(&self, subject_id: i64) -> Result<ProgressSummary> {
        let chapters = self.get_chapters_by_subject(subject_id)?;
        Ok(ProgressSummary::from_chapters(&chapters))
    }

    fn overall_progress(&self) -> Result<ProgressSummary> {
        let chapters = self.get_all_chapters()?;
        Ok(ProgressSummary::from_chapters(&chapters))
    }

    fn next_task(&self, subject_id: i64) -> Result<Option<NextTask>> {
        let chapters = self.get_chapters_by_subject(subject_id)?;
        Ok(progress::next_task(&chapters))
    }

    fn todo_chapters(&self) -> Result<Vec<TodoChapter>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, s.name, c.video_completed
             FROM chapters c
             JOIN subjects s ON c.subject_id = s.id
             WHERE c.is_completed = 0
             ORDER BY c.id",
        )?;
        let todos = stmt
            .query_map([], |row| {
                let video_completed: bool = row.get(3)?;
                Ok(TodoChapter {
                    chapter_id: row.get(0)?,
                    chapter_name: row.get(1)?,
                    subject_name: row.get(2)?,
                    subtask: if video_completed {
                        Subtask::Exercises
                    } else {
                        Subtask::Video
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    fn study_days(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT date(timestamp, 'localtime') AS day
             FROM study_sessions ORDER BY day DESC",
        )?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raw
            .iter()
            .filter_map(|s| date_utils::parse_date(s))
            .collect())
    }

    fn total_study_minutes(&self) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(duration_minutes), 0) FROM study_sessions",
                [],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
