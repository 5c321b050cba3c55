//! SQLite schema definitions.

/// Connection pragmas applied at open.
pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
"#;

/// Complete schema for the local SQLite database.
///
/// Every syncable table keys rows by a local surrogate id and carries a
/// nullable `remote_id` recorded after a successful remote creation. Local
/// foreign keys always reference the surrogate.
pub const SCHEMA: &str = r#"
-- Semesters
CREATE TABLE IF NOT EXISTS semesters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER,
    name TEXT NOT NULL
);

-- Subjects (semester_id is nullable so orphans survive until repair)
CREATE TABLE IF NOT EXISTS subjects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER,
    semester_id INTEGER REFERENCES semesters(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    exam_date TEXT,
    test_date TEXT,
    notes TEXT NOT NULL DEFAULT ''
);

-- Chapters (is_completed is always video AND exercises)
CREATE TABLE IF NOT EXISTS chapters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER,
    subject_id INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    video_completed INTEGER NOT NULL DEFAULT 0,
    exercises_completed INTEGER NOT NULL DEFAULT 0,
    is_completed INTEGER NOT NULL DEFAULT 0,
    due_date TEXT
);

-- Study sessions (append-only)
CREATE TABLE IF NOT EXISTS study_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER,
    subject_id INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    duration_minutes INTEGER NOT NULL,
    timestamp TEXT NOT NULL
);

-- Gamification profile
CREATE TABLE IF NOT EXISTS user_profile (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    xp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    total_sessions INTEGER NOT NULL DEFAULT 0
);

-- Pending remote operations
CREATE TABLE IF NOT EXISTS outbox (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity TEXT NOT NULL,
    op TEXT NOT NULL,
    local_id INTEGER,
    remote_id INTEGER,
    attempts INTEGER NOT NULL DEFAULT 0,
    next_attempt_at TEXT NOT NULL
);

-- Sync metadata
CREATE TABLE IF NOT EXISTS sync_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_pull_at TEXT
);

-- Indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_semesters_remote ON semesters(remote_id) WHERE remote_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_subjects_remote ON subjects(remote_id) WHERE remote_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_chapters_remote ON chapters(remote_id) WHERE remote_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_remote ON study_sessions(remote_id) WHERE remote_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_subjects_semester ON subjects(semester_id);
CREATE INDEX IF NOT EXISTS idx_chapters_subject ON chapters(subject_id);
CREATE INDEX IF NOT EXISTS idx_sessions_subject ON study_sessions(subject_id);
CREATE INDEX IF NOT EXISTS idx_outbox_due ON outbox(next_attempt_at);
"#;

/// Initialize the profile row if not exists.
pub const INIT_USER_PROFILE: &str = r#"
INSERT OR IGNORE INTO user_profile (id) VALUES (1);
"#;

/// Initialize sync state if not exists.
pub const INIT_SYNC_STATE: &str = r#"
INSERT OR IGNORE INTO sync_state (id) VALUES (1);
"#;
