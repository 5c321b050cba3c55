//! Streak and gamification tests.
//!
//! Streak seeding writes sessions at local noon on chosen days, so the
//! local-day bucketing gives the same answer in any timezone.

mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;

use common::fixtures;
use common::TestContext;
use studentpro_lib::db::{date_utils, SemesterRepository, SessionRepository, SubjectRepository};
use studentpro_lib::services::{stats, study};

/// Seed one session per given day offset (0 = today).
fn seed_sessions(ctx: &TestContext, day_offsets: &[i64]) -> i64 {
    let repo = ctx.repo();
    let semester = repo.insert_semester("Semester 1").unwrap();
    let subject = repo.insert_subject(semester.id, "Math").unwrap();
    let today = date_utils::today_local();
    for offset in day_offsets {
        let at = fixtures::local_noon(today - Duration::days(*offset));
        repo.insert_session(subject.id, 25, at).unwrap();
    }
    subject.id
}

/// Test consecutive local study days count up.
#[tokio::test]
async fn test_streak_counts_consecutive_days() {
    let ctx = TestContext::new();
    seed_sessions(&ctx, &[0, 1, 2]);
    assert_eq!(stats::study_streak(&ctx.state).await.unwrap(), 3);
}

/// Test a missed day cuts the run.
#[tokio::test]
async fn test_streak_breaks_on_a_missed_day() {
    let ctx = TestContext::new();
    seed_sessions(&ctx, &[0, 2, 3]);
    assert_eq!(stats::study_streak(&ctx.state).await.unwrap(), 1);
}

/// Test a streak ending yesterday is still alive today.
#[tokio::test]
async fn test_streak_survives_until_end_of_today() {
    let ctx = TestContext::new();
    seed_sessions(&ctx, &[1, 2]);
    assert_eq!(stats::study_streak(&ctx.state).await.unwrap(), 2);
}

/// Test a streak whose last day is older than yesterday is dead.
#[tokio::test]
async fn test_stale_streak_is_zero() {
    let ctx = TestContext::new();
    seed_sessions(&ctx, &[2, 3, 4]);
    assert_eq!(stats::study_streak(&ctx.state).await.unwrap(), 0);

    let empty = TestContext::new();
    assert_eq!(stats::study_streak(&empty.state).await.unwrap(), 0);
}

/// Test several sessions on one day count as a single streak day.
#[tokio::test]
async fn test_multiple_sessions_one_day_count_once() {
    let ctx = TestContext::new();
    seed_sessions(&ctx, &[0, 0, 0, 1]);
    assert_eq!(stats::study_streak(&ctx.state).await.unwrap(), 2);
}

/// Test logging a session counts toward today's streak.
#[tokio::test]
async fn test_logged_session_counts_today() {
    let ctx = TestContext::new();
    let subject_id = seed_sessions(&ctx, &[]);
    study::log_session(&ctx.state, subject_id, 25).await.unwrap();
    assert!(stats::study_streak(&ctx.state).await.unwrap() >= 1);
    assert_eq!(stats::total_study_minutes(&ctx.state).await.unwrap(), 25);
}

/// Test XP awards accumulate and level up exactly at the threshold.
#[tokio::test]
async fn test_awards_level_up_at_threshold() {
    let ctx = TestContext::new();

    let award = study::award_xp(&ctx.state, 400).await.unwrap();
    assert_eq!(award.xp, 400);
    assert_eq!(award.level, 1);
    assert!(!award.leveled_up);

    let award = study::award_xp(&ctx.state, 100).await.unwrap();
    assert_eq!(award.xp, 500);
    assert_eq!(award.level, 2);
    assert!(award.leveled_up);

    // persisted, not just returned
    let profile = stats::profile(&ctx.state).await.unwrap();
    assert_eq!(profile.xp, 500);
    assert_eq!(profile.level, 2);
    assert_eq!(profile.total_sessions, 2);
}

/// Test resetting progress clears the history and the profile but keeps
/// the planner data.
#[tokio::test]
async fn test_reset_progress_clears_history_and_profile() {
    let ctx = TestContext::new();
    let subject_id = seed_sessions(&ctx, &[0, 1]);
    study::award_xp(&ctx.state, 600).await.unwrap();

    study::reset_progress(&ctx.state).await.unwrap();

    assert!(study::list_sessions(&ctx.state).await.unwrap().is_empty());
    assert_eq!(stats::total_study_minutes(&ctx.state).await.unwrap(), 0);
    let profile = stats::profile(&ctx.state).await.unwrap();
    assert_eq!(profile.xp, 0);
    assert_eq!(profile.level, 1);
    assert_eq!(profile.total_sessions, 0);

    // planner data survives a progress reset
    let subject = ctx.repo().get_subject(subject_id).unwrap();
    assert!(subject.is_some());
}
