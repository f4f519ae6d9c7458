//! Job worker - main worker loop

use crate::error::{RankCheckError, Result};
use crate::worker::{JobQueue, WorkItem};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Outcome of running one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed(String),
    Panicked(String),
}

/// Single consumer that runs queued work items one at a time
pub struct JobWorker {
    queue: Arc<JobQueue>,
    shutdown: CancellationToken,
}

impl JobWorker {
    /// Create a new worker over a queue
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self {
            queue,
            shutdown: CancellationToken::new(),
        }
    }

    /// Get a handle to signal shutdown
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Main worker loop
    ///
    /// Runs items until shutdown is signaled. A failing or panicking item is
    /// logged and discarded; it never ends the loop. An item already running
    /// when shutdown fires is allowed to finish.
    pub async fn run(&self) -> Result<()> {
        info!("Starting rank-checker worker...");

        loop {
            let item = match self.queue.dequeue(&self.shutdown).await {
                Ok(item) => item,
                Err(RankCheckError::Cancelled) => {
                    info!("Shutdown signal received, stopping worker...");
                    break;
                }
                Err(e) => {
                    error!("Worker queue error: {}", e);
                    return Err(e);
                }
            };

            self.run_item(item).await;
        }

        info!("Worker stopped ({} item(s) left in queue)", self.queue.pending());
        Ok(())
    }

    /// Run a single item with failure isolation
    pub async fn run_item(&self, item: WorkItem) -> ItemOutcome {
        let label = item.label().to_string();
        info!("Running {}", label);

        match AssertUnwindSafe(item.into_future()).catch_unwind().await {
            Ok(Ok(())) => {
                info!("{} finished", label);
                ItemOutcome::Succeeded
            }
            Ok(Err(e)) => {
                error!("{} failed: {}", label, e);
                ItemOutcome::Failed(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("{} panicked: {}", label, message);
                ItemOutcome::Panicked(message)
            }
        }
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Setup signal handlers for graceful shutdown
pub fn setup_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating shutdown...");
                shutdown.cancel();
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn explode(message: &'static str) -> Result<()> {
        panic!("{}", message)
    }

    fn recording(label: &str, log: &Arc<Mutex<Vec<String>>>) -> WorkItem {
        let log = log.clone();
        let name = label.to_string();
        WorkItem::new(label, move || {
            async move {
                log.lock().unwrap().push(name);
                Ok(())
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_stop_the_loop() {
        let queue = Arc::new(JobQueue::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.enqueue(recording("first", &log)).unwrap();
        queue
            .enqueue(WorkItem::new("failing", || {
                async { Err(RankCheckError::StoreError("disk full".into())) }.boxed()
            }))
            .unwrap();
        queue
            .enqueue(WorkItem::new("panicking", || {
                async { explode("extractor exploded") }.boxed()
            }))
            .unwrap();
        queue.enqueue(recording("last", &log)).unwrap();

        let worker = JobWorker::new(queue.clone());
        let shutdown = worker.shutdown_handle();
        let handle = worker.spawn();

        tokio::time::timeout(Duration::from_secs(5), async {
            while queue.pending() > 0 || log.lock().unwrap().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shutdown.cancel();
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(*log.lock().unwrap(), vec!["first".to_string(), "last".to_string()]);
    }

    #[tokio::test]
    async fn run_item_reports_outcomes() {
        let worker = JobWorker::new(Arc::new(JobQueue::new()));

        let ok = worker
            .run_item(WorkItem::new("ok", || async { Ok(()) }.boxed()))
            .await;
        assert_eq!(ok, ItemOutcome::Succeeded);

        let failed = worker
            .run_item(WorkItem::new("bad", || {
                async { Err(RankCheckError::NotFound(3)) }.boxed()
            }))
            .await;
        assert_eq!(failed, ItemOutcome::Failed("Rank check job 3 not found".to_string()));

        let panicked = worker
            .run_item(WorkItem::new("boom", || async { explode("boom") }.boxed()))
            .await;
        assert_eq!(panicked, ItemOutcome::Panicked("boom".to_string()));
    }

    #[tokio::test]
    async fn idle_worker_stops_on_shutdown() {
        let worker = JobWorker::new(Arc::new(JobQueue::new()));
        let shutdown = worker.shutdown_handle();
        let handle = worker.spawn();

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
