//! Manual mode tests: nothing is queued for mutations, and a manual
//! upload pushes the full dataset including rows that never synced.

mod common;

use pretty_assertions::assert_eq;

use common::TestContext;
use studentpro_lib::config::SyncMode;
use studentpro_lib::db::{ChapterRepository, SemesterRepository, SubjectRepository};
use studentpro_lib::remote::{Table, TableCall};
use studentpro_lib::services::{planner, study};
use studentpro_lib::sync::SyncError;

/// Test manual mode keeps mutations local and unqueued.
#[tokio::test]
async fn test_manual_mode_keeps_mutations_local() {
    let ctx = TestContext::with_mode(SyncMode::Manual);
    ctx.sign_in_and_pull().await;

    planner::add_semester(&ctx.state, "Semester 1").await.unwrap();

    assert_eq!(ctx.pending(), 0);
    assert!(ctx.client.rows(Table::Semesters).is_empty());
}

/// Test a manual upload pushes the whole tree, rows that never had an
/// automatic push included.
#[tokio::test]
async fn test_upload_pushes_never_synced_rows() {
    let ctx = TestContext::with_mode(SyncMode::Manual);
    ctx.sign_in_and_pull().await;

    let semester = planner::add_semester(&ctx.state, "Semester 1").await.unwrap();
    let subject = planner::add_subject(&ctx.state, semester.id, "Math")
        .await
        .unwrap();
    let chapter = planner::add_chapter(&ctx.state, subject.id, "Algebra", None)
        .await
        .unwrap();
    study::log_session(&ctx.state, subject.id, 25).await.unwrap();
    assert_eq!(ctx.pending(), 0);

    let stats = ctx.state.sync.push_all().await.unwrap();
    assert_eq!(stats.semesters, 1);
    assert_eq!(stats.subjects, 1);
    assert_eq!(stats.chapters, 1);
    assert_eq!(stats.sessions, 1);
    assert!(stats.profile_pushed);
    assert_eq!(stats.queue_flushed, 0);

    assert_eq!(ctx.client.rows(Table::Semesters).len(), 1);
    assert_eq!(ctx.client.rows(Table::Subjects).len(), 1);
    assert_eq!(ctx.client.rows(Table::Chapters).len(), 1);
    assert_eq!(ctx.client.rows(Table::StudySessions).len(), 1);

    // the upload recorded every server id locally
    assert!(ctx.repo().get_semester(semester.id).unwrap().unwrap().remote_id.is_some());
    let subject = ctx.repo().get_subject(subject.id).unwrap().unwrap();
    assert!(subject.remote_id.is_some());
    assert!(ctx.repo().get_chapter(chapter.id).unwrap().unwrap().remote_id.is_some());

    // children referenced their parent's server id
    let chapters = ctx.client.rows(Table::Chapters);
    assert_eq!(chapters[0]["subject_id"].as_i64(), subject.remote_id);
    let sessions = ctx.client.rows(Table::StudySessions);
    assert_eq!(sessions[0]["subject_id"].as_i64(), subject.remote_id);
}

/// Test a manual upload flushes queued deletes before the table walk.
#[tokio::test]
async fn test_upload_flushes_queued_deletes() {
    let ctx = TestContext::with_mode(SyncMode::Manual);
    ctx.sign_in_and_pull().await;

    let semester = planner::add_semester(&ctx.state, "Semester 1").await.unwrap();
    let subject = planner::add_subject(&ctx.state, semester.id, "Math")
        .await
        .unwrap();
    planner::add_chapter(&ctx.state, subject.id, "Algebra", None)
        .await
        .unwrap();
    ctx.state.sync.push_all().await.unwrap();

    // deletes are queued even in manual mode
    planner::delete_subject(&ctx.state, subject.id).await.unwrap();
    assert_eq!(ctx.pending(), 2);

    let stats = ctx.state.sync.push_all().await.unwrap();
    assert_eq!(stats.queue_flushed, 2);
    assert_eq!(ctx.pending(), 0);
    assert!(ctx.client.rows(Table::Subjects).is_empty());
    assert!(ctx.client.rows(Table::Chapters).is_empty());
    assert_eq!(ctx.client.rows(Table::Semesters).len(), 1);
}

/// Test uploading without a session is rejected up front.
#[tokio::test]
async fn test_upload_requires_a_session() {
    let ctx = TestContext::new();
    planner::add_semester(&ctx.state, "Semester 1").await.unwrap();

    let err = ctx.state.sync.push_all().await.unwrap_err();
    assert!(matches!(err, SyncError::NotAuthenticated));
    assert!(ctx.client.calls().is_empty());
}

/// Test a second upload updates synced rows instead of duplicating them.
#[tokio::test]
async fn test_second_upload_updates_not_inserts() {
    let ctx = TestContext::with_mode(SyncMode::Manual);
    ctx.sign_in_and_pull().await;

    let semester = planner::add_semester(&ctx.state, "Semester 1").await.unwrap();
    let subject = planner::add_subject(&ctx.state, semester.id, "Math")
        .await
        .unwrap();
    study::log_session(&ctx.state, subject.id, 25).await.unwrap();

    let first = ctx.state.sync.push_all().await.unwrap();
    assert_eq!(first.sessions, 1);

    let second = ctx.state.sync.push_all().await.unwrap();
    // sessions never change, so a synced one is skipped entirely
    assert_eq!(second.sessions, 0);
    assert_eq!(second.semesters, 1);

    assert_eq!(ctx.client.rows(Table::Semesters).len(), 1);
    assert_eq!(ctx.client.rows(Table::StudySessions).len(), 1);
    let updated_semesters = ctx
        .client
        .calls()
        .iter()
        .filter(|call| matches!(call, TableCall::Update(Table::Semesters, _, _)))
        .count();
    assert_eq!(updated_semesters, 1);
}
