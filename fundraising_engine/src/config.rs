use std::time::Duration;

use crate::{
    fe_api::DEFAULT_STORAGE_TIMEOUT,
    sync::{DEFAULT_QUEUE_CAPACITY, DEFAULT_UPSERT_TIMEOUT, DEFAULT_WORKER_COUNT},
};

pub const DEFAULT_SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Tuning knobs for the search sync pipeline and the settlement path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of background workers draining the sync queue.
    pub sync_workers: usize,
    pub queue_capacity: usize,
    /// Deadline for a single search index call (upsert or search).
    pub index_timeout: Duration,
    /// Deadline for a single primary store call.
    pub storage_timeout: Duration,
    /// How long to wait for the workers to drain the queue on shutdown before aborting them.
    pub shutdown_grace_period: Duration,
    /// Re-index a campaign every time its collected total changes.
    pub resync_on_settlement: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_workers: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            index_timeout: DEFAULT_UPSERT_TIMEOUT,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            shutdown_grace_period: DEFAULT_SHUTDOWN_GRACE_PERIOD,
            resync_on_settlement: true,
        }
    }
}
