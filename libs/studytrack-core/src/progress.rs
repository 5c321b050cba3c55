//! Completion progress and next-task selection.

use crate::types::{Chapter, Subtask};
use serde::{Deserialize, Serialize};

/// Integer percentage of `done` out of `total`, truncated.
///
/// Returns 0 when `total` is zero.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done * 100) / total) as u8
}

/// Completion percentage across chapters.
///
/// Each chapter contributes two subtasks; the percentage is completed
/// subtasks over total subtasks, truncated to an integer.
pub fn completion_percent(chapters: &[Chapter]) -> u8 {
    let done: u64 = chapters.iter().map(Chapter::subtasks_done).sum();
    percent(done, chapters.len() as u64 * 2)
}

/// The next subtask to work on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextTask {
    pub chapter_id: i64,
    pub chapter_name: String,
    pub subtask: Subtask,
}

/// First incomplete subtask across `chapters`, which must be in creation
/// order. Within a chapter the video comes before the exercises.
pub fn next_task(chapters: &[Chapter]) -> Option<NextTask> {
    chapters.iter().find_map(|chapter| {
        chapter.next_subtask().map(|subtask| NextTask {
            chapter_id: chapter.id,
            chapter_name: chapter.name.clone(),
            subtask,
        })
    })
}
