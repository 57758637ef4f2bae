use std::{fmt::Debug, time::Duration};

use log::*;
use tokio::time::timeout;

use super::errors::SettlementError;
use crate::{
    db::traits::PrimaryStore,
    db_types::{Amount, Campaign, CampaignId, SyncJob},
    sync::{EnqueueResult, SyncQueue},
};

pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// `AggregateUpdater` maintains each campaign's `amount_collected` total.
///
/// All changes go through the store's atomic increment, so no matter how concurrent calls to [`Self::add`] interleave,
/// the final total is the initial value plus the sum of every delta. When a [`SyncQueue`] is attached, the updated
/// campaign is handed to it so that the search index picks up the new total.
#[derive(Clone)]
pub struct AggregateUpdater<B> {
    db: B,
    sync_queue: Option<SyncQueue>,
    storage_timeout: Duration,
}

impl<B> Debug for AggregateUpdater<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AggregateUpdater(resync: {})", self.sync_queue.is_some())
    }
}

impl<B> AggregateUpdater<B> {
    pub fn new(db: B) -> Self {
        Self { db, sync_queue: None, storage_timeout: DEFAULT_STORAGE_TIMEOUT }
    }

    /// Enqueue a fresh campaign snapshot for indexing after every change to the total.
    pub fn with_sync_queue(mut self, queue: SyncQueue) -> Self {
        self.sync_queue = Some(queue);
        self
    }

    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.storage_timeout = storage_timeout;
        self
    }

    pub fn storage_timeout(&self) -> Duration {
        self.storage_timeout
    }

    /// Passes the campaign on to the search sync queue, if one is attached. Never waits.
    pub fn publish_change(&self, campaign: &Campaign) -> Option<EnqueueResult> {
        let queue = self.sync_queue.as_ref()?;
        let result = queue.enqueue(SyncJob::new(campaign.clone()));
        if result != EnqueueResult::Accepted {
            warn!(
                "💰️ Campaign {} total changed to {}, but the search index will not be updated ({result:?})",
                campaign.id, campaign.amount_collected
            );
        }
        Some(result)
    }
}

impl<B> AggregateUpdater<B>
where B: PrimaryStore
{
    /// Adds `delta` to the campaign's collected amount and returns the updated campaign.
    pub async fn add(&self, campaign_id: &CampaignId, delta: Amount) -> Result<Campaign, SettlementError<B>> {
        trace!("💰️ Adding {delta} to campaign {campaign_id}");
        let campaign = timeout(self.storage_timeout, self.db.increment_amount_collected(campaign_id, delta))
            .await
            .map_err(|_| SettlementError::Timeout(self.storage_timeout))?
            .map_err(SettlementError::DatabaseError)?
            .ok_or_else(|| SettlementError::CampaignNotFound(campaign_id.clone()))?;
        debug!("💰️ Campaign {campaign_id} has now collected {}", campaign.amount_collected);
        self.publish_change(&campaign);
        Ok(campaign)
    }
}
