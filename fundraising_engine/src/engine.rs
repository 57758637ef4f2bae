use std::fmt::Debug;

use log::*;

use crate::{
    config::EngineConfig,
    db::traits::PrimaryStore,
    fe_api::{AggregateUpdater, CampaignApi, SettlementApi},
    search::{SearchIndex, CAMPAIGN_INDEX},
    sync::{ShutdownReport, SyncQueue, SyncWorkerPool, WorkerOptions},
};

/// Everything needed to run the fundraising back end in one place: the primary store, the search index, the sync
/// queue and the worker pool that drains it.
///
/// The worker pool is started in [`FundraisingEngine::start`], before any API handle can enqueue a job. API handles
/// are cheap to create and can be handed out freely. Call [`FundraisingEngine::shutdown`] to drain the queue and
/// close the store.
pub struct FundraisingEngine<B, I> {
    db: B,
    index: I,
    queue: SyncQueue,
    workers: SyncWorkerPool,
    config: EngineConfig,
}

impl<B, I> Debug for FundraisingEngine<B, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FundraisingEngine({:?})", self.config)
    }
}

impl<B, I> FundraisingEngine<B, I>
where
    B: PrimaryStore,
    I: SearchIndex,
{
    pub fn start(db: B, index: I, config: EngineConfig) -> Self {
        let queue = SyncQueue::new(config.queue_capacity);
        let options = WorkerOptions { upsert_timeout: config.index_timeout, index_name: CAMPAIGN_INDEX.to_string() };
        let workers = SyncWorkerPool::start(config.sync_workers, queue.clone(), index.clone(), options);
        info!("🚀️ Fundraising engine started on {}", db.url());
        Self { db, index, queue, workers, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn sync_queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn workers(&self) -> &SyncWorkerPool {
        &self.workers
    }

    pub fn campaign_api(&self) -> CampaignApi<B, I> {
        CampaignApi::new(self.db.clone(), self.index.clone(), self.queue.clone())
            .with_storage_timeout(self.config.storage_timeout)
            .with_search_timeout(self.config.index_timeout)
    }

    pub fn settlement_api(&self) -> SettlementApi<B> {
        let api = SettlementApi::new(self.db.clone()).with_storage_timeout(self.config.storage_timeout);
        if self.config.resync_on_settlement {
            api.with_sync_queue(self.queue.clone())
        } else {
            api
        }
    }

    pub fn aggregate_updater(&self) -> AggregateUpdater<B> {
        let updater = AggregateUpdater::new(self.db.clone()).with_storage_timeout(self.config.storage_timeout);
        if self.config.resync_on_settlement {
            updater.with_sync_queue(self.queue.clone())
        } else {
            updater
        }
    }

    /// Stops accepting sync jobs, gives the workers the configured grace period to drain the queue, and closes the
    /// primary store.
    pub async fn shutdown(self) -> ShutdownReport {
        let Self { mut db, workers, config, .. } = self;
        let report = workers.shutdown(config.shutdown_grace_period).await;
        if report.drained() {
            info!("🚀️ Sync queue drained");
        } else {
            warn!(
                "🚀️ Shutdown grace period expired. {} workers aborted and {} sync jobs abandoned",
                report.aborted, report.abandoned_jobs
            );
        }
        if let Err(e) = db.close().await {
            warn!("🚀️ Error closing the primary store. {e}");
        }
        report
    }
}
