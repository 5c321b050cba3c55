//! Deadline window scanning for the dashboard.

use crate::types::{Chapter, Subject};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Days ahead included in the deadline warning window.
pub const DEADLINE_WINDOW_DAYS: i64 = 3;

/// Kind of dated item in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    Exam,
    Test,
    Chapter,
}

/// Dated item within the warning window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    pub kind: DeadlineKind,
    pub label: String,
    pub date: NaiveDate,
}

/// Nearest upcoming exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamCountdown {
    pub subject: String,
    pub date: NaiveDate,
    pub days_left: i64,
}

/// Deadlines falling in `today ..= today + window_days`, sorted by date.
///
/// Subject exam and test dates always count; chapter due dates count only
/// while the chapter is incomplete.
pub fn upcoming_deadlines(
    subjects: &[Subject],
    chapters: &[Chapter],
    today: NaiveDate,
    window_days: i64,
) -> Vec<Deadline> {
    let end = today + Duration::days(window_days);
    let in_window = |date: NaiveDate| date >= today && date <= end;

    let subject_names: HashMap<i64, &str> = subjects
        .iter()
        .map(|subject| (subject.id, subject.name.as_str()))
        .collect();

    let mut deadlines = Vec::new();
    for subject in subjects {
        if let Some(date) = subject.exam_date.filter(|d| in_window(*d)) {
            deadlines.push(Deadline {
                kind: DeadlineKind::Exam,
                label: format!("{} exam", subject.name),
                date,
            });
        }
        if let Some(date) = subject.test_date.filter(|d| in_window(*d)) {
            deadlines.push(Deadline {
                kind: DeadlineKind::Test,
                label: format!("{} test", subject.name),
                date,
            });
        }
    }
    for chapter in chapters.iter().filter(|c| !c.is_completed) {
        if let Some(date) = chapter.due_date.filter(|d| in_window(*d)) {
            let subject = subject_names
                .get(&chapter.subject_id)
                .copied()
                .unwrap_or("unknown subject");
            deadlines.push(Deadline {
                kind: DeadlineKind::Chapter,
                label: format!("{} ({})", chapter.name, subject),
                date,
            });
        }
    }

    deadlines.sort_by(|a, b| a.date.cmp(&b.date));
    deadlines
}

/// Nearest exam dated today or later, with days remaining.
pub fn next_exam(subjects: &[Subject], today: NaiveDate) -> Option<ExamCountdown> {
    subjects
        .iter()
        .filter_map(|subject| {
            subject
                .exam_date
                .filter(|date| *date >= today)
                .map(|date| (date, subject.name.as_str()))
        })
        .min_by_key(|(date, _)| *date)
        .map(|(date, subject)| ExamCountdown {
            subject: subject.to_string(),
            date,
            days_left: (date - today).num_days(),
        })
}
