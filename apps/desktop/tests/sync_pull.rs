//! Pull tests: applying the remote dataset into the local store.

mod common;

use chrono::Utc;
use pretty_assertions::assert_eq;

use common::fixtures;
use common::TestContext;
use studentpro_lib::config::SyncMode;
use studentpro_lib::db::{
    ChapterRepository, ProfileRepository, SemesterRepository, SessionRepository,
    SubjectRepository, SyncStateRepository,
};
use studentpro_lib::remote::Table;
use studentpro_lib::services::{planner, study};
use studentpro_lib::sync::{SyncError, SyncFailure};

/// Test a full remote dataset is applied in dependency order.
#[tokio::test]
async fn test_pull_applies_remote_dataset() {
    let ctx = TestContext::new();
    let user = common::test_user();
    let semester_id = ctx
        .client
        .seed(Table::Semesters, fixtures::remote_semester(user.id, "Fall 2026"));
    let math_id = ctx.client.seed(
        Table::Subjects,
        fixtures::remote_subject(user.id, Some(semester_id), "Math"),
    );
    let electives_id = ctx.client.seed(
        Table::Subjects,
        fixtures::remote_subject(user.id, None, "Electives"),
    );
    let chapter_id = ctx.client.seed(
        Table::Chapters,
        fixtures::remote_chapter(user.id, math_id, "Algebra", true, false),
    );
    let session_id = ctx.client.seed(
        Table::StudySessions,
        fixtures::remote_session(user.id, math_id, 45, Utc::now()),
    );
    ctx.client
        .seed(Table::UserProfile, fixtures::remote_profile(user.id, 900, 2, 7));

    ctx.sign_in();
    let stats = ctx.state.sync.pull_all().await.unwrap();
    assert_eq!(stats.semesters, 1);
    assert_eq!(stats.subjects, 2);
    assert_eq!(stats.chapters, 1);
    assert_eq!(stats.sessions, 1);
    assert!(stats.profile_pulled);
    assert_eq!(stats.skipped, 0);

    let semesters = ctx.repo().get_all_semesters().unwrap();
    assert_eq!(semesters.len(), 1);
    assert_eq!(semesters[0].name, "Fall 2026");
    assert_eq!(semesters[0].remote_id, Some(semester_id));

    let subjects = ctx.repo().get_all_subjects().unwrap();
    assert_eq!(subjects.len(), 2);
    let math = subjects.iter().find(|s| s.name == "Math").unwrap();
    assert_eq!(math.semester_id, Some(semesters[0].id));
    assert_eq!(math.remote_id, Some(math_id));
    let electives = subjects.iter().find(|s| s.name == "Electives").unwrap();
    assert_eq!(electives.remote_id, Some(electives_id));
    assert_eq!(electives.semester_id, None);

    let chapters = ctx.repo().get_all_chapters().unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].remote_id, Some(chapter_id));
    assert_eq!(chapters[0].subject_id, math.id);
    assert!(chapters[0].video_completed);
    assert!(!chapters[0].is_completed);

    let sessions = ctx.repo().get_all_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].remote_id, Some(session_id));
    assert_eq!(sessions[0].duration_minutes, 45);

    let profile = ctx.repo().get_profile().unwrap();
    assert_eq!(profile.xp, 900);
    assert_eq!(profile.level, 2);
    assert_eq!(profile.total_sessions, 7);

    assert!(ctx.repo().get_sync_state().unwrap().last_pull_at.is_some());
}

/// Test pulling the same dataset twice changes nothing.
#[tokio::test]
async fn test_pull_twice_is_idempotent() {
    let ctx = TestContext::new();
    let user = common::test_user();
    let semester_id = ctx
        .client
        .seed(Table::Semesters, fixtures::remote_semester(user.id, "Fall"));
    ctx.client.seed(
        Table::Subjects,
        fixtures::remote_subject(user.id, Some(semester_id), "Math"),
    );
    ctx.client
        .seed(Table::UserProfile, fixtures::remote_profile(user.id, 100, 1, 2));

    ctx.sign_in();
    ctx.state.sync.pull_all().await.unwrap();
    let stats = ctx.state.sync.pull_all().await.unwrap();

    assert_eq!(stats.semesters, 1);
    assert_eq!(stats.subjects, 1);
    assert_eq!(ctx.repo().get_all_semesters().unwrap().len(), 1);
    assert_eq!(ctx.repo().get_all_subjects().unwrap().len(), 1);
}

/// Test rows whose parent is unknown remotely are skipped, not crashed
/// on and not misfiled.
#[tokio::test]
async fn test_pull_skips_rows_with_unknown_parents() {
    let ctx = TestContext::new();
    let user = common::test_user();
    ctx.client
        .seed(Table::Semesters, fixtures::remote_semester(user.id, "Fall"));
    ctx.client.seed(
        Table::Subjects,
        fixtures::remote_subject(user.id, Some(888), "Ghost Course"),
    );
    ctx.client.seed(
        Table::Chapters,
        fixtures::remote_chapter(user.id, 999, "Ghost Chapter", false, false),
    );

    ctx.sign_in();
    let stats = ctx.state.sync.pull_all().await.unwrap();

    assert_eq!(stats.semesters, 1);
    assert_eq!(stats.subjects, 0);
    assert_eq!(stats.chapters, 0);
    assert_eq!(stats.skipped, 2);
    assert!(ctx.repo().get_all_subjects().unwrap().is_empty());
    assert!(ctx.repo().get_all_chapters().unwrap().is_empty());
}

/// Test rows that only exist locally survive a pull untouched.
#[tokio::test]
async fn test_pull_preserves_local_only_rows() {
    let ctx = TestContext::with_mode(SyncMode::Manual);
    let local = planner::add_semester(&ctx.state, "Offline Semester")
        .await
        .unwrap();

    let user = common::test_user();
    ctx.client
        .seed(Table::Semesters, fixtures::remote_semester(user.id, "Fall"));
    ctx.sign_in_and_pull().await;

    let semesters = ctx.repo().get_all_semesters().unwrap();
    assert_eq!(semesters.len(), 2);
    let kept = semesters.iter().find(|s| s.id == local.id).unwrap();
    assert_eq!(kept.name, "Offline Semester");
    assert_eq!(kept.remote_id, None);
}

/// Test the first pull for a fresh account seeds the remote profile from
/// the local one instead of zeroing local progress.
#[tokio::test]
async fn test_first_pull_seeds_remote_profile() {
    let ctx = TestContext::new();
    study::award_xp(&ctx.state, 300).await.unwrap();

    ctx.sign_in();
    let stats = ctx.state.sync.pull_all().await.unwrap();
    assert!(!stats.profile_pulled);

    let rows = ctx.client.rows(Table::UserProfile);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["xp"].as_i64(), Some(300));

    let profile = ctx.repo().get_profile().unwrap();
    assert_eq!(profile.xp, 300);
}

/// Test the remote profile wins over local numbers once it exists.
#[tokio::test]
async fn test_remote_profile_wins_over_local() {
    let ctx = TestContext::new();
    study::award_xp(&ctx.state, 100).await.unwrap();
    let user = common::test_user();
    ctx.client
        .seed(Table::UserProfile, fixtures::remote_profile(user.id, 900, 2, 7));

    ctx.sign_in_and_pull().await;

    let profile = ctx.repo().get_profile().unwrap();
    assert_eq!(profile.xp, 900);
    assert_eq!(profile.level, 2);
}

/// Test a pull against an unreachable service fails cleanly and leaves
/// local data alone.
#[tokio::test]
async fn test_pull_failure_keeps_local_data() {
    let client = std::sync::Arc::new(common::OfflineTableClient::new());
    let state = common::state_with(client, SyncMode::Automatic);
    let semester = planner::add_semester(&state, "Semester 1").await.unwrap();

    common::sign_in_on(&state);
    let err = state.sync.pull_all().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Failure(SyncFailure::Network(_))
    ));

    let repo = state.repository.lock().unwrap();
    assert_eq!(repo.get_semester(semester.id).unwrap().unwrap().name, "Semester 1");
    assert!(repo.get_sync_state().unwrap().last_pull_at.is_none());
}
