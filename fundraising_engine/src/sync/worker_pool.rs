use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
        PoisonError,
    },
    time::Duration,
};

use log::*;
use thiserror::Error;
use tokio::{
    task::{AbortHandle, JoinHandle},
    time::Instant,
};

use crate::{
    db_types::SyncJob,
    search::{CampaignDocument, SearchIndex, SearchIndexError, CAMPAIGN_INDEX},
    sync::SyncQueue,
};

pub const DEFAULT_WORKER_COUNT: usize = 5;
pub const DEFAULT_UPSERT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Deadline for a single upsert call. A stalled search cluster cannot hold a worker for longer than this.
    pub upsert_timeout: Duration,
    /// The index that documents are written to.
    pub index_name: String,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self { upsert_timeout: DEFAULT_UPSERT_TIMEOUT, index_name: CAMPAIGN_INDEX.to_string() }
    }
}

#[derive(Debug, Error)]
enum SyncError {
    #[error("Search index error. {0}")]
    Index(#[from] SearchIndexError),
    #[error("Upsert did not complete within {0:?}")]
    Timeout(Duration),
}

#[derive(Default)]
struct Stats {
    synced: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Number of workers that were still busy when the grace period ran out and had to be aborted.
    pub aborted: usize,
    /// Jobs still sitting in the queue after shutdown. These are lost.
    pub abandoned_jobs: usize,
}

impl ShutdownReport {
    pub fn drained(&self) -> bool {
        self.aborted == 0 && self.abandoned_jobs == 0
    }
}

/// The task currently processing a job for a worker, if any.
type JobSlot = Arc<Mutex<Option<AbortHandle>>>;

struct Worker {
    handle: JoinHandle<()>,
    current_job: JobSlot,
}

impl Worker {
    /// Aborts the worker loop and the job task it is waiting on.
    fn abort(self) {
        self.handle.abort();
        if let Some(job) = self.current_job.lock().unwrap_or_else(PoisonError::into_inner).take() {
            job.abort();
        }
    }
}

/// A fixed set of background tasks that move campaign snapshots from the [`SyncQueue`] into the search index.
///
/// Failed upserts are logged and the job is discarded: there are no retries and no dead-letter queue. The index stays
/// stale for that campaign until another snapshot of it is synced successfully.
pub struct SyncWorkerPool {
    queue: SyncQueue,
    workers: Vec<Worker>,
    stats: Arc<Stats>,
}

impl SyncWorkerPool {
    /// Starts `worker_count` workers on the current tokio runtime. The workers run until the queue is closed (see
    /// [`Self::shutdown`]).
    pub fn start<I: SearchIndex>(worker_count: usize, queue: SyncQueue, index: I, options: WorkerOptions) -> Self {
        let stats = Arc::new(Stats::default());
        let workers = (0..worker_count.max(1))
            .map(|id| {
                let queue = queue.clone();
                let index = index.clone();
                let options = options.clone();
                let stats = Arc::clone(&stats);
                let current_job = JobSlot::default();
                let handle = tokio::spawn(run_worker(id, queue, index, options, stats, Arc::clone(&current_job)));
                Worker { handle, current_job }
            })
            .collect::<Vec<_>>();
        info!("🚀️ Started {} search sync workers", workers.len());
        Self { queue, workers, stats }
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// The number of snapshots successfully written to the index.
    pub fn synced_count(&self) -> u64 {
        self.stats.synced.load(Ordering::SeqCst)
    }

    /// The number of snapshots that were discarded because the upsert failed, timed out or panicked.
    pub fn failed_count(&self) -> u64 {
        self.stats.failed.load(Ordering::SeqCst)
    }

    /// Closes the queue, lets the workers drain whatever is left in it, and waits up to `grace_period` for them to
    /// finish. Workers still running after that are aborted, along with the job each one is processing.
    pub async fn shutdown(self, grace_period: Duration) -> ShutdownReport {
        info!("📬️ Shutting down sync workers. {} jobs queued", self.queue.len());
        self.queue.close();
        let deadline = Instant::now() + grace_period;
        let mut aborted = 0;
        for mut worker in self.workers {
            let joined = tokio::time::timeout_at(deadline, &mut worker.handle).await;
            match joined {
                Ok(Ok(())) => {},
                Ok(Err(e)) => warn!("📬️ Sync worker ended abnormally. {e}"),
                Err(_) => {
                    worker.abort();
                    aborted += 1;
                },
            }
        }
        let abandoned_jobs = self.queue.len();
        if aborted > 0 || abandoned_jobs > 0 {
            warn!(
                "📬️ Sync workers did not drain within {grace_period:?}. {aborted} workers aborted, {abandoned_jobs} \
                 jobs abandoned"
            );
        } else {
            info!("📬️ Sync workers have shut down gracefully");
        }
        ShutdownReport { aborted, abandoned_jobs }
    }
}

async fn run_worker<I: SearchIndex>(
    worker_id: usize,
    queue: SyncQueue,
    index: I,
    options: WorkerOptions,
    stats: Arc<Stats>,
    current_job: JobSlot,
) {
    debug!("📬️ Sync worker {worker_id} started");
    while let Some(job) = queue.dequeue().await {
        let campaign_id = job.campaign_id().clone();
        let index = index.clone();
        let options = options.clone();
        // Each job runs in its own task so that a panic while processing it ends that task, not this loop.
        let task = tokio::spawn(async move { sync_to_index(job, &index, &options).await });
        *current_job.lock().unwrap_or_else(PoisonError::into_inner) = Some(task.abort_handle());
        let outcome = task.await;
        current_job.lock().unwrap_or_else(PoisonError::into_inner).take();
        match outcome {
            Ok(Ok(())) => {
                stats.synced.fetch_add(1, Ordering::SeqCst);
                debug!("📬️ Worker {worker_id} synced campaign {campaign_id}");
            },
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                error!("📬️ Worker {worker_id} could not index campaign {campaign_id}. The job is discarded. {e}");
            },
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                error!("📬️ Worker {worker_id} crashed while indexing campaign {campaign_id}. The job is discarded. {e}");
            },
        }
    }
    debug!("📬️ Sync worker {worker_id} has shut down");
}

async fn sync_to_index<I: SearchIndex>(job: SyncJob, index: &I, options: &WorkerOptions) -> Result<(), SyncError> {
    let id = job.campaign_id().to_string();
    let document = CampaignDocument::from(job.into_snapshot());
    tokio::time::timeout(options.upsert_timeout, index.upsert_document(&options.index_name, &id, &document))
        .await
        .map_err(|_| SyncError::Timeout(options.upsert_timeout))??;
    Ok(())
}
