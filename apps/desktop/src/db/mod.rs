//! Local SQLite database operations.

pub mod date_utils;
pub mod error;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use repository::{
    ChapterRepository, DeletedRemoteRefs, LocalSyncState, OutboxItem, OutboxRepository,
    ProfileRepository, ProgressSummary, SemesterRepository, SessionRepository, SqliteRepository,
    StatsRepository, SubjectRepository, SyncEntity, SyncOp, SyncStateRepository, TodoChapter,
};
