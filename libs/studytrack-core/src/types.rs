//! Core types for the study tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Academic term grouping subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
    pub name: String,
}

/// Course within a semester.
///
/// `semester_id` is nullable: subjects whose semester was removed remain
/// until adopted by a repair pass or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
    pub semester_id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_date: Option<NaiveDate>,
    pub notes: String,
}

/// The two subtasks that make up a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subtask {
    Video,
    Exercises,
}

impl Subtask {
    /// Get the subtask name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Exercises => "exercises",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "exercises" => Some(Self::Exercises),
            _ => None,
        }
    }
}

/// Unit of study within a subject.
///
/// `is_completed` always equals `video_completed && exercises_completed`;
/// mutate the flags through [`Chapter::set_subtask`] to keep it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
    pub subject_id: i64,
    pub name: String,
    pub video_completed: bool,
    pub exercises_completed: bool,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl Chapter {
    /// Set one subtask flag and recompute the completion flag.
    pub fn set_subtask(&mut self, part: Subtask, done: bool) {
        match part {
            Subtask::Video => self.video_completed = done,
            Subtask::Exercises => self.exercises_completed = done,
        }
        self.is_completed = self.video_completed && self.exercises_completed;
    }

    /// Next incomplete subtask, video before exercises.
    pub fn next_subtask(&self) -> Option<Subtask> {
        if !self.video_completed {
            Some(Subtask::Video)
        } else if !self.exercises_completed {
            Some(Subtask::Exercises)
        } else {
            None
        }
    }

    /// Number of completed subtasks (0-2).
    pub fn subtasks_done(&self) -> u64 {
        self.video_completed as u64 + self.exercises_completed as u64
    }
}

/// Recorded study time for a subject. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
    pub subject_id: i64,
    pub duration_minutes: i64,
    pub timestamp: DateTime<Utc>,
}

/// Gamification profile. Exactly one exists per local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub xp: i64,
    pub level: i64,
    pub total_sessions: i64,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            total_sessions: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn completion_flag_tracks_both_subtasks() {
        let mut chapter = Chapter {
            id: 1,
            remote_id: None,
            subject_id: 1,
            name: "Algebra".to_string(),
            video_completed: false,
            exercises_completed: false,
            is_completed: false,
            due_date: None,
        };

        chapter.set_subtask(Subtask::Video, true);
        assert!(!chapter.is_completed);

        chapter.set_subtask(Subtask::Exercises, true);
        assert!(chapter.is_completed);

        chapter.set_subtask(Subtask::Video, false);
        assert!(!chapter.is_completed);
        assert!(chapter.exercises_completed);
    }

    #[test]
    fn next_subtask_prefers_video() {
        let mut chapter = Chapter {
            id: 1,
            remote_id: None,
            subject_id: 1,
            name: "Algebra".to_string(),
            video_completed: false,
            exercises_completed: false,
            is_completed: false,
            due_date: None,
        };
        assert_eq!(chapter.next_subtask(), Some(Subtask::Video));

        chapter.set_subtask(Subtask::Video, true);
        assert_eq!(chapter.next_subtask(), Some(Subtask::Exercises));

        chapter.set_subtask(Subtask::Exercises, true);
        assert_eq!(chapter.next_subtask(), None);
    }

    #[test]
    fn subtask_round_trips_through_str() {
        assert_eq!(Subtask::from_str("video"), Some(Subtask::Video));
        assert_eq!(Subtask::from_str("exercises"), Some(Subtask::Exercises));
        assert_eq!(Subtask::from_str("reading"), None);
        assert_eq!(Subtask::Video.as_str(), "video");
    }

    #[test]
    fn default_profile_starts_at_level_one() {
        let profile = UserProfile::default();
        assert_eq!(profile.xp, 0);
        assert_eq!(profile.level, 1);
        assert_eq!(profile.total_sessions, 0);
    }
}
