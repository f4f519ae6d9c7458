//! Unbounded FIFO queue of pending work items

use crate::error::{RankCheckError, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

type WorkFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// A deferred unit of work, run once by the worker
pub struct WorkItem {
    label: String,
    work: WorkFn,
}

impl WorkItem {
    pub fn new<F>(label: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, Result<()>> + Send + 'static,
    {
        Self {
            label: label.into(),
            work: Box::new(work),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consume the item and produce its future
    pub fn into_future(self) -> BoxFuture<'static, Result<()>> {
        (self.work)()
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem").field("label", &self.label).finish()
    }
}

/// Many producers, cancellable consumers, delivery in enqueue order
pub struct JobQueue {
    sender: UnboundedSender<WorkItem>,
    receiver: Mutex<UnboundedReceiver<WorkItem>>,
    pending: AtomicUsize,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
        }
    }

    /// Append an item to the tail; never blocks
    pub fn enqueue(&self, item: WorkItem) -> Result<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.sender.send(item).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            RankCheckError::QueueClosed
        })
    }

    /// Wait for the next item, or fail with `Cancelled` once `cancel` fires
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<WorkItem> {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RankCheckError::Cancelled),
            item = async {
                let mut receiver = self.receiver.lock().await;
                receiver.recv().await
            } => item,
        };

        // The queue owns a sender, so the channel cannot close under us
        let item = item.ok_or(RankCheckError::QueueClosed)?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Ok(item)
    }

    /// Items enqueued but not yet dequeued
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn noop(label: &str) -> WorkItem {
        WorkItem::new(label, || async { Ok(()) }.boxed())
    }

    #[tokio::test]
    async fn delivers_in_enqueue_order() {
        let queue = JobQueue::new();
        let cancel = CancellationToken::new();
        for i in 0..5 {
            assert_ok!(queue.enqueue(noop(&format!("job-{}", i))));
        }
        assert_eq!(queue.pending(), 5);

        for i in 0..5 {
            let item = queue.dequeue(&cancel).await.unwrap();
            assert_eq!(item.label(), format!("job-{}", i));
        }
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn interleaved_submitters_keep_per_submitter_order() {
        let queue = Arc::new(JobQueue::new());
        let mut handles = Vec::new();
        for submitter in 0..4 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                for n in 0..25 {
                    queue.enqueue(noop(&format!("{}:{}", submitter, n))).unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let cancel = CancellationToken::new();
        let mut last_seen = [-1i32; 4];
        for _ in 0..100 {
            let item = queue.dequeue(&cancel).await.unwrap();
            let (submitter, n) = item.label().split_once(':').unwrap();
            let submitter: usize = submitter.parse().unwrap();
            let n: i32 = n.parse().unwrap();
            assert!(n > last_seen[submitter], "item {} delivered out of order", item.label());
            last_seen[submitter] = n;
        }
        assert_eq!(last_seen, [24; 4]);
    }

    #[tokio::test]
    async fn dequeue_waits_for_a_late_enqueue() {
        let queue = Arc::new(JobQueue::new());
        let cancel = CancellationToken::new();

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                queue.enqueue(noop("late")).unwrap();
            })
        };

        let item = queue.dequeue(&cancel).await.unwrap();
        assert_eq!(item.label(), "late");
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_interrupts_an_idle_wait() {
        let queue = JobQueue::new();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = queue.dequeue(&cancel).await;
        assert!(matches!(result, Err(RankCheckError::Cancelled)));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn work_item_runs_its_closure() {
        let item = WorkItem::new("fails", || {
            async { Err(RankCheckError::StoreError("down".into())) }.boxed()
        });
        assert!(item.into_future().await.is_err());
    }
}
