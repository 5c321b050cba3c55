//! Background worker that drains the push queue.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::SyncService;

/// How often the worker re-checks the queue when nothing nudges it. Items
/// rescheduled with backoff become due between nudges.
const IDLE_POLL: Duration = Duration::from_secs(5);

/// Handle to the background drain loop. Dropping it stops the loop; queued
/// items are durable and picked up again on the next start.
pub struct SyncWorker {
    handle: JoinHandle<()>,
}

impl SyncWorker {
    /// Start the drain loop on the current tokio runtime.
    pub fn spawn(service: SyncService) -> Self {
        let handle = tokio::spawn(async move {
            debug!("sync worker started");
            loop {
                tokio::select! {
                    _ = service.inner.notify.notified() => {}
                    _ = tokio::time::sleep(IDLE_POLL) => {}
                }
                if service.ready_to_drain() {
                    service.run_pending().await;
                }
            }
        });
        Self { handle }
    }

    /// Stop the loop. An in-flight item is retried on the next start.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
