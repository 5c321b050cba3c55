//! Background worker tests. The worker is spawned explicitly here; every
//! other test file drives the queue by hand.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use common::TestContext;
use studentpro_lib::remote::Table;
use studentpro_lib::services::planner;
use studentpro_lib::sync::SyncWorker;

async fn wait_for_drain(ctx: &TestContext) {
    for _ in 0..40 {
        if ctx.pending() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("queue never drained");
}

/// Test the worker picks up nudges and drains the queue on its own.
#[tokio::test]
async fn test_worker_drains_queue_in_background() {
    let ctx = TestContext::new();
    ctx.sign_in_and_pull().await;
    let worker = SyncWorker::spawn(ctx.state.sync.clone());

    planner::add_semester(&ctx.state, "Semester 1").await.unwrap();
    wait_for_drain(&ctx).await;

    assert_eq!(ctx.client.rows(Table::Semesters).len(), 1);
    worker.shutdown();
}

/// Test the worker holds queued pushes until the session's opening pull
/// has run.
#[tokio::test]
async fn test_worker_waits_for_opening_pull() {
    let ctx = TestContext::new();
    let worker = SyncWorker::spawn(ctx.state.sync.clone());

    ctx.sign_in();
    planner::add_semester(&ctx.state, "Semester 1").await.unwrap();

    // the nudge wakes the worker, but the barrier holds it back
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(ctx.pending(), 1);
    assert!(ctx.client.rows(Table::Semesters).is_empty());

    ctx.state.sync.pull_all().await.unwrap();
    wait_for_drain(&ctx).await;
    assert_eq!(ctx.client.rows(Table::Semesters).len(), 1);
    worker.shutdown();
}
