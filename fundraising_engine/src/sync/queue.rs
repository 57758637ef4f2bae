use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
    RwLock,
};

use log::*;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Mutex,
};

use crate::db_types::SyncJob;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    Accepted,
    /// The queue was full and the job was discarded.
    Dropped,
    /// The queue has been closed for shutdown and the job was discarded.
    Closed,
}

struct Inner {
    // `None` once the queue has been closed. Dropping the only sender lets consumers drain what is left and then see
    // the end of the stream.
    sender: RwLock<Option<mpsc::Sender<SyncJob>>>,
    receiver: Mutex<mpsc::Receiver<SyncJob>>,
    capacity: usize,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

/// A bounded, multi-producer, multi-consumer queue of [`SyncJob`]s.
///
/// `enqueue` never waits: if the queue is full the job is dropped and the drop counter is incremented. `dequeue`
/// suspends the caller until a job is available. Clones share the same queue.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Arc<Inner>,
}

impl SyncQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let inner = Inner {
            sender: RwLock::new(Some(sender)),
            receiver: Mutex::new(receiver),
            capacity,
            dropped: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Offers a job to the queue without blocking.
    pub fn enqueue(&self, job: SyncJob) -> EnqueueResult {
        let guard = match self.inner.sender.read() {
            Ok(g) => g,
            Err(e) => {
                error!("📬️ Sync queue lock is poisoned. Dropping job for campaign {}. {e}", job.campaign_id());
                self.inner.dropped.fetch_add(1, Ordering::SeqCst);
                return EnqueueResult::Dropped;
            },
        };
        let Some(sender) = guard.as_ref() else {
            self.inner.rejected.fetch_add(1, Ordering::SeqCst);
            warn!("📬️ Sync queue is closed, rejecting job for campaign {}", job.campaign_id());
            return EnqueueResult::Closed;
        };
        match sender.try_send(job) {
            Ok(()) => {
                trace!("📬️ Sync job queued");
                EnqueueResult::Accepted
            },
            Err(TrySendError::Full(job)) => {
                let dropped = self.inner.dropped.fetch_add(1, Ordering::SeqCst) + 1;
                warn!("📬️ Sync queue full, dropping job for campaign {}. {dropped} jobs dropped so far", job.campaign_id());
                EnqueueResult::Dropped
            },
            Err(TrySendError::Closed(job)) => {
                self.inner.rejected.fetch_add(1, Ordering::SeqCst);
                warn!("📬️ Sync queue has no consumers, rejecting job for campaign {}", job.campaign_id());
                EnqueueResult::Closed
            },
        }
    }

    /// Waits for the next job. Jobs come out in the order they were accepted.
    ///
    /// Returns `None` once the queue has been closed and every remaining job has been handed out.
    pub async fn dequeue(&self) -> Option<SyncJob> {
        let mut receiver = self.inner.receiver.lock().await;
        receiver.recv().await
    }

    /// Stops accepting new jobs. Jobs already in the queue can still be dequeued.
    pub fn close(&self) {
        match self.inner.sender.write() {
            Ok(mut sender) => {
                if sender.take().is_some() {
                    info!("📬️ Sync queue closed. {} jobs left to drain", self.len());
                }
            },
            Err(e) => error!("📬️ Could not close the sync queue. {e}"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.sender.read().map(|s| s.is_none()).unwrap_or(true)
    }

    /// The number of jobs waiting to be picked up.
    pub fn len(&self) -> usize {
        match self.inner.sender.read() {
            Ok(guard) => match guard.as_ref() {
                Some(sender) => self.inner.capacity - sender.capacity(),
                None => self.inner.receiver.try_lock().map(|r| r.len()).unwrap_or_default(),
            },
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// The number of jobs discarded because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::SeqCst)
    }

    /// The number of jobs discarded because the queue was closed.
    pub fn rejected_count(&self) -> u64 {
        self.inner.rejected.load(Ordering::SeqCst)
    }
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::db_types::{Amount, Campaign, CampaignId};

    fn job(title: &str) -> SyncJob {
        let now = Utc::now();
        SyncJob::new(Campaign {
            id: CampaignId::random(),
            user_id: "u1".into(),
            username: "alice".into(),
            title: title.into(),
            description: String::default(),
            image: String::default(),
            target: Amount::from(100),
            amount_collected: Amount::from(0),
            deadline: now,
            created_at: now,
            updated_at: now,
        })
    }

    #[tokio::test]
    async fn fifo_order() {
        let queue = SyncQueue::new(10);
        for title in ["a", "b", "c"] {
            assert_eq!(queue.enqueue(job(title)), EnqueueResult::Accepted);
        }
        assert_eq!(queue.len(), 3);
        for title in ["a", "b", "c"] {
            assert_eq!(queue.dequeue().await.unwrap().snapshot().title, title);
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn drops_when_full() {
        let queue = SyncQueue::new(2);
        assert_eq!(queue.enqueue(job("a")), EnqueueResult::Accepted);
        assert_eq!(queue.enqueue(job("b")), EnqueueResult::Accepted);
        assert_eq!(queue.enqueue(job("c")), EnqueueResult::Dropped);
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.len(), 2);
        // Nothing was duplicated to compensate for the drop
        assert_eq!(queue.dequeue().await.unwrap().snapshot().title, "a");
        assert_eq!(queue.dequeue().await.unwrap().snapshot().title, "b");
        assert!(queue.is_empty());
        assert_eq!(queue.enqueue(job("d")), EnqueueResult::Accepted);
        assert_eq!(queue.dropped_count(), 1);
    }

    #[tokio::test]
    async fn close_rejects_new_jobs_but_drains_old_ones() {
        let queue = SyncQueue::new(5);
        queue.enqueue(job("a"));
        queue.enqueue(job("b"));
        queue.close();
        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(job("c")), EnqueueResult::Closed);
        assert_eq!(queue.rejected_count(), 1);
        assert_eq!(queue.dropped_count(), 0);
        assert_eq!(queue.dequeue().await.unwrap().snapshot().title, "a");
        assert_eq!(queue.dequeue().await.unwrap().snapshot().title, "b");
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn dequeue_waits_for_a_job() {
        let queue = SyncQueue::new(5);
        let consumer = queue.clone();
        let handle = tokio::spawn(async move { consumer.dequeue().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        queue.enqueue(job("late"));
        let received = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert_eq!(received.unwrap().snapshot().title, "late");
    }

    #[tokio::test]
    async fn concurrent_producers_never_exceed_capacity() {
        let queue = SyncQueue::new(50);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let q = queue.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..20 {
                    q.enqueue(job(&format!("job-{i}")));
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(queue.len(), 50);
        assert_eq!(queue.dropped_count(), 160 - 50);
    }
}
