//! Core study-tracking library shared by the desktop engine.
//!
//! Provides:
//! - Domain types (Semester, Subject, Chapter, StudySession, UserProfile)
//! - Completion progress and next-task selection
//! - Study streak computation
//! - XP and level progression
//! - Deadline window scanning

pub mod deadlines;
pub mod progress;
pub mod streak;
pub mod types;
pub mod xp;

pub use deadlines::{
    next_exam, upcoming_deadlines, Deadline, DeadlineKind, ExamCountdown, DEADLINE_WINDOW_DAYS,
};
pub use progress::{completion_percent, next_task, percent, NextTask};
pub use streak::study_streak;
pub use types::{Chapter, Semester, StudySession, Subject, Subtask, UserProfile};
pub use xp::{award_xp, level_for_xp, xp_into_level, XpAward, XP_PER_LEVEL};
