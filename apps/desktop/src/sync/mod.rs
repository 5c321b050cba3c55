//! Replication between the local store and the remote tables.
//!
//! The local store is always written first and never waits on the network.
//! Mutations made while signed in land in a durable outbox that a
//! background worker drains; a full pull runs once per session before any
//! queued push goes out. Remote failures surface as typed [`SyncFailure`]
//! values and never roll back local state.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AuthSession, SessionContext};
use crate::db::{
    ChapterRepository, DbError, OutboxItem, OutboxRepository, ProfileRepository,
    SemesterRepository, SessionRepository, SqliteRepository, SubjectRepository, SyncEntity,
    SyncOp, SyncStateRepository,
};
use crate::remote::{Table, TableClient, TableError};
use studytrack_core::types::{Chapter, Semester, StudySession, Subject, UserProfile};

mod model;
mod worker;

pub use worker::SyncWorker;

use model::{ChapterRow, ProfileRow, SemesterRow, SessionRow, SubjectRow};

/// A remote operation's typed failure.
///
/// `Network` failures and a handful of status codes are worth retrying;
/// `Auth` failures park the queue until the session is renewed; everything
/// else is a permanent rejection of that particular request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {status} - {message}")]
    Auth { status: u16, message: String },

    #[error("server error: {status} - {message}")]
    Server { status: u16, message: String },
}

impl SyncFailure {
    /// Whether retrying later can succeed without user action.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncFailure::Network(_) => true,
            SyncFailure::Auth { .. } => false,
            SyncFailure::Server { status, .. } => matches!(status, 408 | 429 | 500..=599),
        }
    }

    /// Rejections no amount of retrying will fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, SyncFailure::Server { .. }) && !self.is_retryable()
    }
}

impl From<TableError> for SyncFailure {
    fn from(e: TableError) -> Self {
        match e {
            TableError::Network(message) => SyncFailure::Network(message),
            TableError::Status {
                status: status @ (401 | 403),
                message,
            } => SyncFailure::Auth { status, message },
            TableError::Status { status, message } => SyncFailure::Server { status, message },
            // Status 0 marks a response we could not make sense of.
            TableError::Parse(message) => SyncFailure::Server { status: 0, message },
        }
    }
}

/// Sync errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Failure(#[from] SyncFailure),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("not signed in")]
    NotAuthenticated,
}

/// Counts of rows applied by a pull.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PullStats {
    pub semesters: usize,
    pub subjects: usize,
    pub chapters: usize,
    pub sessions: usize,
    pub profile_pulled: bool,
    /// Rows skipped because their parent is unknown remotely.
    pub skipped: usize,
}

/// Counts of rows pushed by a manual upload.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PushStats {
    pub semesters: usize,
    pub subjects: usize,
    pub chapters: usize,
    pub sessions: usize,
    pub profile_pushed: bool,
    /// Queued operations flushed before the table walk.
    pub queue_flushed: usize,
}

/// Retry delay before the next attempt: 5s doubling up to about 21 minutes.
pub(crate) fn backoff_seconds(attempts: i32) -> i64 {
    5 * (1_i64 << attempts.clamp(0, 8))
}

/// What became of one queued operation.
pub(crate) enum ItemOutcome {
    Done,
    /// The local row is gone; there is nothing left to push.
    Stale,
}

struct SyncServiceInner {
    tables: Arc<dyn TableClient>,
    repository: Arc<Mutex<SqliteRepository>>,
    session: SessionContext,
    notify: Notify,
    /// Session barrier: no queued push goes out before the session's pull
    /// has completed or been abandoned.
    pull_done: AtomicBool,
    /// Set when a push hit an auth failure; cleared on the next session.
    auth_parked: AtomicBool,
    automatic: AtomicBool,
    /// Serializes the worker drain against manual pull/push runs.
    drain_lock: AsyncMutex<()>,
}

/// Coordinates replication between the local store and the remote tables.
///
/// Clone-able because all state lives behind an Arc; clones share the
/// queue barrier, the session handle and the worker nudge.
#[derive(Clone)]
pub struct SyncService {
    inner: Arc<SyncServiceInner>,
}

impl SyncService {
    pub fn new(
        tables: Arc<dyn TableClient>,
        repository: Arc<Mutex<SqliteRepository>>,
        session: SessionContext,
    ) -> Self {
        Self {
            inner: Arc::new(SyncServiceInner {
                tables,
                repository,
                session,
                notify: Notify::new(),
                pull_done: AtomicBool::new(false),
                auth_parked: AtomicBool::new(false),
                automatic: AtomicBool::new(true),
                drain_lock: AsyncMutex::new(()),
            }),
        }
    }

    /// Reset the per-session barriers. Call right after sign-in or restore,
    /// before the session's pull.
    pub fn begin_session(&self) {
        self.inner.pull_done.store(false, Ordering::SeqCst);
        self.inner.auth_parked.store(false, Ordering::SeqCst);
    }

    /// Drop session-scoped sync state on sign-out. Queued operations are
    /// discarded: unsynced rows stay local and a later manual upload can
    /// still push them, while undelivered deletes are abandoned, so the
    /// remote rows they targeted survive and the next pull restores them
    /// locally.
    pub fn end_session(&self) {
        self.inner.pull_done.store(false, Ordering::SeqCst);
        let result = self.repo().clear_outbox();
        if let Err(e) = result {
            warn!(error = %e, "could not clear the push queue");
        }
    }

    /// Wake the background worker.
    pub fn nudge(&self) {
        self.inner.notify.notify_one();
    }

    /// Turn automatic background pushes on or off.
    pub fn set_automatic(&self, on: bool) {
        self.inner.automatic.store(on, Ordering::SeqCst);
    }

    /// Download the remote dataset and merge it into the local store.
    ///
    /// Tables are walked in dependency order so parents are in place before
    /// their children arrive. Remote rows win over local rows with the same
    /// server id; rows that never synced are left alone. A fetch failure
    /// aborts the remainder but keeps everything already applied.
    pub async fn pull_all(&self) -> Result<PullStats, SyncError> {
        let result = self.pull_all_inner().await;
        // Release the worker even when the pull was abandoned; queued
        // pushes should not wait forever on an unreachable service.
        self.inner.pull_done.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
        result
    }

    /// Upload everything local to the remote tables.
    ///
    /// Flushes the queued operations first (deletes for rows that no longer
    /// exist locally live only there), then walks every table in dependency
    /// order, inserting rows that never synced and updating the rest.
    pub async fn push_all(&self) -> Result<PushStats, SyncError> {
        let session = self.session()?;
        let _guard = self.inner.drain_lock.lock().await;
        let user_id = session.user.id;
        let mut stats = PushStats::default();

        stats.queue_flushed = self.flush_queue(&session).await?;

        let semesters = { self.repo().get_all_semesters()? };
        let mut semester_ids: HashMap<i64, i64> = HashMap::new();
        for semester in &semesters {
            let remote = self.push_semester(&session, semester).await?;
            semester_ids.insert(semester.id, remote);
            stats.semesters += 1;
        }

        let subjects = { self.repo().get_all_subjects()? };
        let mut subject_ids: HashMap<i64, i64> = HashMap::new();
        for subject in &subjects {
            let semester_remote = subject
                .semester_id
                .and_then(|local| semester_ids.get(&local).copied());
            let remote = self.push_subject(&session, subject, semester_remote).await?;
            subject_ids.insert(subject.id, remote);
            stats.subjects += 1;
        }

        let chapters = { self.repo().get_all_chapters()? };
        for chapter in &chapters {
            let subject_remote = match subject_ids.get(&chapter.subject_id) {
                Some(remote) => *remote,
                None => continue,
            };
            self.push_chapter(&session, chapter, subject_remote).await?;
            stats.chapters += 1;
        }

        let sessions = { self.repo().get_all_sessions()? };
        for study_session in &sessions {
            // Sessions never change after insert; ones with a server id
            // are already there.
            if study_session.remote_id.is_some() {
                continue;
            }
            let subject_remote = match subject_ids.get(&study_session.subject_id) {
                Some(remote) => *remote,
                None => continue,
            };
            self.push_session(&session, study_session, subject_remote)
                .await?;
            stats.sessions += 1;
        }

        let profile = { self.repo().get_profile()? };
        self.inner
            .tables
            .upsert(
                Table::UserProfile,
                &session.access_token,
                model::profile_payload(user_id, &profile),
                "user_id",
            )
            .await
            .map_err(SyncFailure::from)?;
        stats.profile_pushed = true;

        info!(
            semesters = stats.semesters,
            subjects = stats.subjects,
            chapters = stats.chapters,
            sessions = stats.sessions,
            flushed = stats.queue_flushed,
            "upload complete"
        );
        Ok(stats)
    }

    /// Process everything currently due in the queue.
    ///
    /// The background worker calls this on every wake-up; callers that need
    /// a synchronous flush (diagnostics, tests) can invoke it directly. A
    /// retryable failure stops the run and reschedules the failed item; an
    /// auth failure parks the queue until the next session.
    pub async fn run_pending(&self) {
        if !self.ready_to_drain() {
            return;
        }
        let _guard = self.inner.drain_lock.lock().await;
        loop {
            if !self.ready_to_drain() {
                break;
            }
            let session = match self.inner.session.snapshot() {
                Some(s) => s,
                None => break,
            };
            let next = { self.repo().next_due(Utc::now()) };
            let item = match next {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "could not read the push queue");
                    break;
                }
            };
            match self.process_item(&session, &item).await {
                Ok(outcome) => {
                    if matches!(outcome, ItemOutcome::Stale) {
                        debug!(item = item.id, "dropping operation for a row that is gone");
                    }
                    if let Err(e) = self.repo().complete_item(item.id) {
                        warn!(error = %e, "could not complete a queue item");
                        break;
                    }
                }
                Err(SyncError::Failure(failure @ SyncFailure::Auth { .. })) => {
                    warn!(error = %failure, "pushes paused until the session is renewed");
                    self.inner.auth_parked.store(true, Ordering::SeqCst);
                    break;
                }
                Err(SyncError::Failure(failure)) if failure.is_retryable() => {
                    let delay = backoff_seconds(item.attempts);
                    warn!(
                        item = item.id,
                        attempts = item.attempts,
                        delay,
                        error = %failure,
                        "push failed, retrying later"
                    );
                    let at = Utc::now() + Duration::seconds(delay);
                    if let Err(e) = self.repo().reschedule_item(item.id, at) {
                        warn!(error = %e, "could not reschedule a queue item");
                    }
                    break;
                }
                Err(SyncError::Failure(failure)) => {
                    warn!(item = item.id, error = %failure, "dropping rejected operation");
                    if let Err(e) = self.repo().complete_item(item.id) {
                        warn!(error = %e, "could not complete a queue item");
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "push processing failed");
                    break;
                }
            }
        }
    }

    // === Pull ===

    async fn pull_all_inner(&self) -> Result<PullStats, SyncError> {
        let session = self.session()?;
        let _guard = self.inner.drain_lock.lock().await;
        let token = session.access_token.clone();
        let user_id = session.user.id;
        let mut stats = PullStats::default();

        let rows: Vec<SemesterRow> = self.fetch(Table::Semesters, &token, user_id).await?;
        let mut semesters: HashMap<i64, i64> = HashMap::new();
        {
            let repo = self.repo();
            for row in &rows {
                let local = repo.upsert_semester_from_remote(row.id, &row.name)?;
                semesters.insert(row.id, local);
            }
        }
        stats.semesters = rows.len();

        let rows: Vec<SubjectRow> = self.fetch(Table::Subjects, &token, user_id).await?;
        let mut subjects: HashMap<i64, i64> = HashMap::new();
        {
            let repo = self.repo();
            for row in &rows {
                let semester_local = match row.semester_id {
                    Some(remote) => match semesters.get(&remote) {
                        Some(local) => Some(*local),
                        None => {
                            warn!(subject = row.id, semester = remote, "skipping subject with unknown semester");
                            stats.skipped += 1;
                            continue;
                        }
                    },
                    None => None,
                };
                let local = repo.upsert_subject_from_remote(
                    row.id,
                    semester_local,
                    &row.name,
                    row.exam_date,
                    row.test_date,
                    row.notes.as_deref().unwrap_or(""),
                )?;
                subjects.insert(row.id, local);
                stats.subjects += 1;
            }
        }

        let rows: Vec<ChapterRow> = self.fetch(Table::Chapters, &token, user_id).await?;
        {
            let repo = self.repo();
            for row in &rows {
                let subject_local = match subjects.get(&row.subject_id) {
                    Some(local) => *local,
                    None => {
                        warn!(chapter = row.id, subject = row.subject_id, "skipping chapter with unknown subject");
                        stats.skipped += 1;
                        continue;
                    }
                };
                repo.upsert_chapter_from_remote(
                    row.id,
                    subject_local,
                    &row.name,
                    row.video_completed,
                    row.exercises_completed,
                    row.due_date,
                )?;
                stats.chapters += 1;
            }
        }

        let rows: Vec<SessionRow> = self.fetch(Table::StudySessions, &token, user_id).await?;
        {
            let repo = self.repo();
            for row in &rows {
                let subject_local = match subjects.get(&row.subject_id) {
                    Some(local) => *local,
                    None => {
                        warn!(session = row.id, subject = row.subject_id, "skipping session with unknown subject");
                        stats.skipped += 1;
                        continue;
                    }
                };
                repo.upsert_session_from_remote(
                    row.id,
                    subject_local,
                    row.duration_minutes,
                    row.timestamp,
                )?;
                stats.sessions += 1;
            }
        }

        let rows: Vec<ProfileRow> = self.fetch(Table::UserProfile, &token, user_id).await?;
        match rows.into_iter().next() {
            Some(row) => {
                let profile = UserProfile {
                    xp: row.xp,
                    level: row.level,
                    total_sessions: row.total_sessions,
                };
                self.repo().save_profile(&profile)?;
                stats.profile_pulled = true;
            }
            None => {
                // First sync for this account: seed the remote profile from
                // the local one rather than wiping local progress.
                let profile = { self.repo().get_profile()? };
                self.inner
                    .tables
                    .upsert(
                        Table::UserProfile,
                        &token,
                        model::profile_payload(user_id, &profile),
                        "user_id",
                    )
                    .await
                    .map_err(SyncFailure::from)?;
            }
        }

        self.repo().set_last_pull(Utc::now())?;
        info!(
            semesters = stats.semesters,
            subjects = stats.subjects,
            chapters = stats.chapters,
            sessions = stats.sessions,
            skipped = stats.skipped,
            "pull complete"
        );
        Ok(stats)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        table: Table,
        token: &str,
        user_id: Uuid,
    ) -> Result<Vec<T>, SyncFailure> {
        let rows = self.inner.tables.select(table, token, user_id).await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| SyncFailure::Server {
                    status: 0,
                    message: format!("malformed {} row: {e}", table.as_str()),
                })
            })
            .collect()
    }

    // === Push ===

    /// Execute one queued operation.
    pub(crate) async fn process_item(
        &self,
        session: &AuthSession,
        item: &OutboxItem,
    ) -> Result<ItemOutcome, SyncError> {
        match item.op {
            SyncOp::Delete => match item.remote_id {
                Some(remote_id) => {
                    self.inner
                        .tables
                        .delete(table_for(item.entity), &session.access_token, remote_id)
                        .await
                        .map_err(SyncFailure::from)?;
                    Ok(ItemOutcome::Done)
                }
                // The row never reached the server.
                None => Ok(ItemOutcome::Stale),
            },
            SyncOp::Upsert => self.push_queued_upsert(session, item).await,
        }
    }

    async fn push_queued_upsert(
        &self,
        session: &AuthSession,
        item: &OutboxItem,
    ) -> Result<ItemOutcome, SyncError> {
        match item.entity {
            SyncEntity::Semester => {
                let local_id = match item.local_id {
                    Some(id) => id,
                    None => return Ok(ItemOutcome::Stale),
                };
                let semester = { self.repo().get_semester(local_id)? };
                let semester = match semester {
                    Some(s) => s,
                    None => return Ok(ItemOutcome::Stale),
                };
                self.push_semester(session, &semester).await?;
                Ok(ItemOutcome::Done)
            }
            SyncEntity::Subject => {
                let local_id = match item.local_id {
                    Some(id) => id,
                    None => return Ok(ItemOutcome::Stale),
                };
                let subject = { self.repo().get_subject(local_id)? };
                let subject = match subject {
                    Some(s) => s,
                    None => return Ok(ItemOutcome::Stale),
                };
                let semester_remote = match subject.semester_id {
                    Some(local) => match self.ensure_semester(session, local).await? {
                        Some(remote) => Some(remote),
                        None => return Ok(ItemOutcome::Stale),
                    },
                    None => None,
                };
                self.push_subject(session, &subject, semester_remote).await?;
                Ok(ItemOutcome::Done)
            }
            SyncEntity::Chapter => {
                let local_id = match item.local_id {
                    Some(id) => id,
                    None => return Ok(ItemOutcome::Stale),
                };
                let chapter = { self.repo().get_chapter(local_id)? };
                let chapter = match chapter {
                    Some(c) => c,
                    None => return Ok(ItemOutcome::Stale),
                };
                let subject_remote = match self.ensure_subject(session, chapter.subject_id).await? {
                    Some(remote) => remote,
                    None => return Ok(ItemOutcome::Stale),
                };
                self.push_chapter(session, &chapter, subject_remote).await?;
                Ok(ItemOutcome::Done)
            }
            SyncEntity::StudySession => {
                let local_id = match item.local_id {
                    Some(id) => id,
                    None => return Ok(ItemOutcome::Stale),
                };
                let study_session = { self.repo().get_session(local_id)? };
                let study_session = match study_session {
                    Some(s) => s,
                    None => return Ok(ItemOutcome::Stale),
                };
                let subject_remote =
                    match self.ensure_subject(session, study_session.subject_id).await? {
                        Some(remote) => remote,
                        None => return Ok(ItemOutcome::Stale),
                    };
                self.push_session(session, &study_session, subject_remote)
                    .await?;
                Ok(ItemOutcome::Done)
            }
            SyncEntity::Profile => {
                let profile = { self.repo().get_profile()? };
                self.inner
                    .tables
                    .upsert(
                        Table::UserProfile,
                        &session.access_token,
                        model::profile_payload(session.user.id, &profile),
                        "user_id",
                    )
                    .await
                    .map_err(SyncFailure::from)?;
                Ok(ItemOutcome::Done)
            }
        }
    }

    /// Send every queued operation now, ignoring backoff schedules.
    async fn flush_queue(&self, session: &AuthSession) -> Result<usize, SyncError> {
        let items = { self.repo().pending_items()? };
        let mut flushed = 0;
        for item in items {
            match self.process_item(session, &item).await {
                Ok(ItemOutcome::Done) => {
                    self.repo().complete_item(item.id)?;
                    flushed += 1;
                }
                Ok(ItemOutcome::Stale) => {
                    self.repo().complete_item(item.id)?;
                }
                Err(SyncError::Failure(failure)) if failure.is_permanent() => {
                    warn!(item = item.id, error = %failure, "dropping rejected operation");
                    self.repo().complete_item(item.id)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(flushed)
    }

    /// Remote id for a semester, pushing it first if it never synced.
    /// `None` means the local row is gone.
    async fn ensure_semester(
        &self,
        session: &AuthSession,
        local_id: i64,
    ) -> Result<Option<i64>, SyncError> {
        let semester = { self.repo().get_semester(local_id)? };
        let semester = match semester {
            Some(s) => s,
            None => return Ok(None),
        };
        if let Some(remote_id) = semester.remote_id {
            return Ok(Some(remote_id));
        }
        Ok(Some(self.push_semester(session, &semester).await?))
    }

    /// Remote id for a subject, pushing it (and its semester) first if
    /// needed. `None` means the local row is gone.
    async fn ensure_subject(
        &self,
        session: &AuthSession,
        local_id: i64,
    ) -> Result<Option<i64>, SyncError> {
        let subject = { self.repo().get_subject(local_id)? };
        let subject = match subject {
            Some(s) => s,
            None => return Ok(None),
        };
        if let Some(remote_id) = subject.remote_id {
            return Ok(Some(remote_id));
        }
        let semester_remote = match subject.semester_id {
            Some(local) => match self.ensure_semester(session, local).await? {
                Some(remote) => Some(remote),
                None => return Ok(None),
            },
            None => None,
        };
        Ok(Some(
            self.push_subject(session, &subject, semester_remote).await?,
        ))
    }

    async fn push_semester(
        &self,
        session: &AuthSession,
        semester: &Semester,
    ) -> Result<i64, SyncError> {
        let payload = model::semester_payload(session.user.id, semester);
        match semester.remote_id {
            Some(remote_id) => {
                self.inner
                    .tables
                    .update(Table::Semesters, &session.access_token, remote_id, payload)
                    .await
                    .map_err(SyncFailure::from)?;
                Ok(remote_id)
            }
            None => {
                let row = self
                    .inner
                    .tables
                    .insert(Table::Semesters, &session.access_token, payload)
                    .await
                    .map_err(SyncFailure::from)?;
                let remote_id = require_server_id(Table::Semesters, &row)?;
                self.repo().set_semester_remote_id(semester.id, remote_id)?;
                debug!(semester = semester.id, remote_id, "semester synced");
                Ok(remote_id)
            }
        }
    }

    async fn push_subject(
        &self,
        session: &AuthSession,
        subject: &Subject,
        semester_remote: Option<i64>,
    ) -> Result<i64, SyncError> {
        let payload = model::subject_payload(session.user.id, semester_remote, subject);
        match subject.remote_id {
            Some(remote_id) => {
                self.inner
                    .tables
                    .update(Table::Subjects, &session.access_token, remote_id, payload)
                    .await
                    .map_err(SyncFailure::from)?;
                Ok(remote_id)
            }
            None => {
                let row = self
                    .inner
                    .tables
                    .insert(Table::Subjects, &session.access_token, payload)
                    .await
                    .map_err(SyncFailure::from)?;
                let remote_id = require_server_id(Table::Subjects, &row)?;
                self.repo().set_subject_remote_id(subject.id, remote_id)?;
                debug!(subject = subject.id, remote_id, "subject synced");
                Ok(remote_id)
            }
        }
    }

    async fn push_chapter(
        &self,
        session: &AuthSession,
        chapter: &Chapter,
        subject_remote: i64,
    ) -> Result<i64, SyncError> {
        let payload = model::chapter_payload(session.user.id, subject_remote, chapter);
        match chapter.remote_id {
            Some(remote_id) => {
                self.inner
                    .tables
                    .update(Table::Chapters, &session.access_token, remote_id, payload)
                    .await
                    .map_err(SyncFailure::from)?;
                Ok(remote_id)
            }
            None => {
                let row = self
                    .inner
                    .tables
                    .insert(Table::Chapters, &session.access_token, payload)
                    .await
                    .map_err(SyncFailure::from)?;
                let remote_id = require_server_id(Table::Chapters, &row)?;
                self.repo().set_chapter_remote_id(chapter.id, remote_id)?;
                debug!(chapter = chapter.id, remote_id, "chapter synced");
                Ok(remote_id)
            }
        }
    }

    async fn push_session(
        &self,
        session: &AuthSession,
        study_session: &StudySession,
        subject_remote: i64,
    ) -> Result<i64, SyncError> {
        if let Some(remote_id) = study_session.remote_id {
            return Ok(remote_id);
        }
        let payload = model::session_payload(session.user.id, subject_remote, study_session);
        let row = self
            .inner
            .tables
            .insert(Table::StudySessions, &session.access_token, payload)
            .await
            .map_err(SyncFailure::from)?;
        let remote_id = require_server_id(Table::StudySessions, &row)?;
        self.repo().set_session_remote_id(study_session.id, remote_id)?;
        Ok(remote_id)
    }

    // === Helpers ===

    fn repo(&self) -> MutexGuard<'_, SqliteRepository> {
        self.inner.repository.lock().expect("repository lock")
    }

    fn session(&self) -> Result<AuthSession, SyncError> {
        self.inner
            .session
            .snapshot()
            .ok_or(SyncError::NotAuthenticated)
    }

    pub(crate) fn ready_to_drain(&self) -> bool {
        self.inner.session.is_signed_in()
            && self.inner.automatic.load(Ordering::SeqCst)
            && self.inner.pull_done.load(Ordering::SeqCst)
            && !self.inner.auth_parked.load(Ordering::SeqCst)
    }
}

fn table_for(entity: SyncEntity) -> Table {
    match entity {
        SyncEntity::Semester => Table::Semesters,
        SyncEntity::Subject => Table::Subjects,
        SyncEntity::Chapter => Table::Chapters,
        SyncEntity::StudySession => Table::StudySessions,
        SyncEntity::Profile => Table::UserProfile,
    }
}

fn require_server_id(table: Table, row: &serde_json::Value) -> Result<i64, SyncFailure> {
    model::server_id(row).ok_or_else(|| SyncFailure::Server {
        status: 0,
        message: format!("insert into {} returned no id", table.as_str()),
    })
}
