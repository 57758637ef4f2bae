use std::{fmt::Debug, future::Future, time::Duration};

use log::*;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use super::{aggregate_updater::DEFAULT_STORAGE_TIMEOUT, errors::CampaignApiError};
use crate::{
    db::traits::PrimaryStore,
    db_types::{Campaign, CampaignId, NewCampaign, PaymentRecord, SyncJob, UserId},
    search::{SearchIndex, SearchIndexError, SearchPage, SearchQuery, CAMPAIGN_INDEX},
    sync::{EnqueueResult, SyncQueue, DEFAULT_UPSERT_TIMEOUT},
};

/// The largest page a single search may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// A campaign together with every payment it has received, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignWithPayments {
    pub campaign: Campaign,
    pub payments: Vec<PaymentRecord>,
}

/// `CampaignApi` is the producer side of the search sync pipeline.
///
/// Writes go to the primary store, which is the system of record, and a snapshot of the result is handed to the
/// [`SyncQueue`]. Enqueueing never waits and never fails the write; if the queue is full the index catches up on the
/// next change, or when [`Self::resync_campaign`] is called. Reads of a single campaign are served by the store, while
/// listings and keyword searches are served by the search index.
pub struct CampaignApi<B, I> {
    db: B,
    index: I,
    sync_queue: SyncQueue,
    index_name: String,
    storage_timeout: Duration,
    search_timeout: Duration,
}

impl<B, I> Debug for CampaignApi<B, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CampaignApi({})", self.index_name)
    }
}

impl<B, I> CampaignApi<B, I> {
    pub fn new(db: B, index: I, sync_queue: SyncQueue) -> Self {
        Self {
            db,
            index,
            sync_queue,
            index_name: CAMPAIGN_INDEX.to_string(),
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            search_timeout: DEFAULT_UPSERT_TIMEOUT,
        }
    }

    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.storage_timeout = storage_timeout;
        self
    }

    pub fn with_search_timeout(mut self, search_timeout: Duration) -> Self {
        self.search_timeout = search_timeout;
        self
    }

    pub fn sync_queue(&self) -> &SyncQueue {
        &self.sync_queue
    }

    /// Hands a campaign snapshot to the sync workers. Returns immediately, whether or not the job was accepted.
    pub fn enqueue_campaign_sync(&self, campaign: &Campaign) -> EnqueueResult {
        let result = self.sync_queue.enqueue(SyncJob::new(campaign.clone()));
        match result {
            EnqueueResult::Accepted => trace!("📬️ Campaign {} queued for indexing", campaign.id),
            _ => warn!("📬️ Campaign {} was not queued for indexing ({result:?})", campaign.id),
        }
        result
    }
}

impl<B, I> CampaignApi<B, I>
where
    B: PrimaryStore,
    I: SearchIndex,
{
    /// Saves a new campaign and queues it for indexing.
    ///
    /// The campaign is assigned a fresh id and timestamps, and starts with nothing collected. The call succeeds as soon
    /// as the campaign is stored; indexing happens in the background.
    pub async fn create_campaign(&self, campaign: NewCampaign) -> Result<Campaign, CampaignApiError<B>> {
        let campaign = self.store_call(self.db.insert_campaign(campaign)).await?;
        info!("🗃️ Campaign {} [{}] created by {}", campaign.id, campaign.title, campaign.user_id);
        self.enqueue_campaign_sync(&campaign);
        Ok(campaign)
    }

    pub async fn fetch_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, CampaignApiError<B>> {
        self.store_call(self.db.fetch_campaign(id)).await
    }

    pub async fn fetch_campaign_with_payments(
        &self,
        id: &CampaignId,
    ) -> Result<CampaignWithPayments, CampaignApiError<B>> {
        let campaign =
            self.fetch_campaign(id).await?.ok_or_else(|| CampaignApiError::CampaignNotFound(id.clone()))?;
        let payments = self.store_call(self.db.fetch_payments_for_campaign(id)).await?;
        trace!("🗃️ Campaign {id} has {} payments", payments.len());
        Ok(CampaignWithPayments { campaign, payments })
    }

    /// Keyword search over campaign titles and descriptions, newest first. `page` is 1-based.
    ///
    /// A blank keyword lists every campaign.
    pub async fn search_campaigns(
        &self,
        keyword: &str,
        page: usize,
        per_page: usize,
    ) -> Result<SearchPage, CampaignApiError<B>> {
        let query = paged_query(page, per_page)?.with_keyword(keyword);
        self.run_search(query).await
    }

    /// Lists the campaigns owned by a user, newest first. `page` is 1-based.
    pub async fn campaigns_for_user(
        &self,
        user_id: &UserId,
        page: usize,
        per_page: usize,
    ) -> Result<SearchPage, CampaignApiError<B>> {
        let query = paged_query(page, per_page)?.with_user_id(user_id.as_str());
        self.run_search(query).await
    }

    /// Re-reads a campaign from the primary store and queues it for indexing.
    ///
    /// Use this to repair the index after dropped or failed sync jobs.
    pub async fn resync_campaign(&self, id: &CampaignId) -> Result<EnqueueResult, CampaignApiError<B>> {
        let campaign =
            self.fetch_campaign(id).await?.ok_or_else(|| CampaignApiError::CampaignNotFound(id.clone()))?;
        info!("🔍️ Resyncing campaign {id} to the search index");
        Ok(self.enqueue_campaign_sync(&campaign))
    }

    async fn run_search(&self, query: SearchQuery) -> Result<SearchPage, CampaignApiError<B>> {
        trace!("🔍️ Searching {}: {query:?}", self.index_name);
        let page = timeout(self.search_timeout, self.index.search(&self.index_name, &query))
            .await
            .map_err(|_| CampaignApiError::Timeout("search index", self.search_timeout))?
            .map_err(|e: SearchIndexError| {
                warn!("🔍️ Campaign search failed. {e}");
                CampaignApiError::SearchError(e)
            })?;
        debug!("🔍️ Search returned {} of {} campaigns", page.documents.len(), page.total);
        Ok(page)
    }

    async fn store_call<T, F>(&self, call: F) -> Result<T, CampaignApiError<B>>
    where F: Future<Output = Result<T, B::Error>> {
        timeout(self.storage_timeout, call)
            .await
            .map_err(|_| CampaignApiError::Timeout("primary store", self.storage_timeout))?
            .map_err(CampaignApiError::DatabaseError)
    }
}

fn paged_query<B: PrimaryStore>(page: usize, per_page: usize) -> Result<SearchQuery, CampaignApiError<B>> {
    if page == 0 {
        return Err(CampaignApiError::InvalidPage("page numbers start at 1".to_string()));
    }
    if per_page == 0 || per_page > MAX_PAGE_SIZE {
        return Err(CampaignApiError::InvalidPage(format!("page size must be between 1 and {MAX_PAGE_SIZE}")));
    }
    if (page - 1).checked_mul(per_page).is_none() {
        return Err(CampaignApiError::InvalidPage(format!("page {page} is out of range")));
    }
    Ok(SearchQuery::default().with_page(page, per_page))
}
