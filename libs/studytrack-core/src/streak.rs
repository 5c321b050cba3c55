//! Study streak computation.

use chrono::NaiveDate;

/// Length of the consecutive-day study run ending at the most recent
/// study day.
///
/// `days` are the distinct calendar dates with at least one recorded
/// session, newest first. A streak is alive only while the most recent
/// study day is today or yesterday; anything older returns 0.
pub fn study_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let newest = match days.first() {
        Some(day) => *day,
        None => return 0,
    };
    let yesterday = match today.pred_opt() {
        Some(day) => day,
        None => today,
    };
    if newest < yesterday {
        return 0;
    }

    let mut streak = 1;
    let mut prev = newest;
    for &day in &days[1..] {
        if prev.pred_opt() == Some(day) {
            streak += 1;
            prev = day;
        } else {
            break;
        }
    }
    streak
}
