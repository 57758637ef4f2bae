//! # Campaign search sync
//!
//! Campaign writes reach the search index asynchronously. A producer (campaign creation, settlement) hands a snapshot
//! of the campaign to the [`SyncQueue`] and returns immediately; a fixed pool of background workers
//! ([`SyncWorkerPool`]) drains the queue and upserts each snapshot into the [`crate::search::SearchIndex`].
//!
//! The queue is bounded. When it is full, new jobs are dropped and counted rather than making the producer wait.
//! Upserts are keyed by campaign id, so any snapshot can safely be delivered more than once.
mod queue;
mod worker_pool;

pub use queue::{EnqueueResult, SyncQueue, DEFAULT_QUEUE_CAPACITY};
pub use worker_pool::{ShutdownReport, SyncWorkerPool, WorkerOptions, DEFAULT_UPSERT_TIMEOUT, DEFAULT_WORKER_COUNT};
