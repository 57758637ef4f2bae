use std::time::{Duration, Instant};

use chrono::Utc;
use fundraising_engine::{
    db_types::{Amount, CampaignId, NewCampaign, SyncJob, UserId},
    search::{CampaignDocument, CAMPAIGN_INDEX},
    fe_api::MAX_PAGE_SIZE,
    sync::WorkerOptions,
    CampaignApi,
    CampaignApiError,
    EngineConfig,
    EnqueueResult,
    FundraisingEngine,
    MemorySearchIndex,
    SettlementApi,
    SqliteDatabase,
    SyncQueue,
    SyncWorkerPool,
};
use support::prepare_env::{new_campaign, prepare_test_env, teardown};

mod support;

const GRACE: Duration = Duration::from_secs(5);

fn new_campaign_request(owner: &str, title: &str, description: &str) -> NewCampaign {
    NewCampaign::new(owner.into(), title, Amount::from(5_000), Utc::now() + chrono::Duration::days(10))
        .with_username(format!("{owner}-name"))
        .with_description(description)
}

fn start_workers(n: usize, queue: &SyncQueue, index: &MemorySearchIndex) -> SyncWorkerPool {
    SyncWorkerPool::start(n, queue.clone(), index.clone(), WorkerOptions::default())
}

fn campaign_api(db: &SqliteDatabase, index: &MemorySearchIndex, queue: &SyncQueue) -> CampaignApi<SqliteDatabase, MemorySearchIndex> {
    CampaignApi::new(db.clone(), index.clone(), queue.clone())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn created_campaigns_reach_the_index() {
    let db = prepare_test_env().await;
    let index = MemorySearchIndex::new();
    let config = EngineConfig { sync_workers: 3, ..EngineConfig::default() };
    let engine = FundraisingEngine::start(db.clone(), index.clone(), config);
    assert_eq!(engine.workers().worker_count(), 3);
    let api = engine.campaign_api();

    let mut ids = Vec::new();
    for i in 0..20 {
        let campaign = api
            .create_campaign(new_campaign_request("owner-1", &format!("Campaign {i}"), "Helping hands"))
            .await
            .expect("Error creating campaign");
        assert_eq!(campaign.amount_collected, Amount::from(0));
        ids.push(campaign.id);
    }

    // Shutting down drains the queue before returning
    let report = engine.shutdown().await;
    assert!(report.drained());
    assert_eq!(index.document_count(CAMPAIGN_INDEX), 20);
    for id in &ids {
        let doc = index.get_document(CAMPAIGN_INDEX, id.as_str()).expect("Campaign missing from index");
        assert_eq!(doc.user_id, "owner-1");
        assert_eq!(doc.description, "Helping hands");
    }
    teardown(db).await;
}

#[tokio::test]
async fn index_converges_on_settled_totals() {
    let db = prepare_test_env().await;
    let index = MemorySearchIndex::new();
    let queue = SyncQueue::new(100);
    // A single worker applies snapshots in the order they were queued
    let workers = start_workers(1, &queue, &index);
    let campaigns = campaign_api(&db, &index, &queue);
    let settlements = SettlementApi::new(db.clone()).with_sync_queue(queue.clone());

    let campaign = campaigns.create_campaign(new_campaign_request("owner-2", "Wells", "Water")).await.unwrap();
    for (checkout, amount) in [("abc", 50), ("def", 30), ("abc", 50)] {
        settlements.settle(checkout, campaign.id.clone(), "payer-1".into(), "Bob", Amount::from(amount)).await.unwrap();
    }
    let stored = campaigns.fetch_campaign_with_payments(&campaign.id).await.unwrap();
    assert_eq!(stored.campaign.amount_collected, Amount::from(80));
    assert_eq!(stored.payments.len(), 2);

    let report = workers.shutdown(GRACE).await;
    assert!(report.drained());
    let doc = index.get_document(CAMPAIGN_INDEX, campaign.id.as_str()).unwrap();
    assert_eq!(doc, CampaignDocument::from(&stored.campaign));
    teardown(db).await;
}

#[tokio::test]
async fn repeated_snapshots_produce_one_document() {
    let db = prepare_test_env().await;
    let campaign = new_campaign(&db, "owner-3", "Orchard").await;
    let index = MemorySearchIndex::new();
    let queue = SyncQueue::new(10);
    for _ in 0..4 {
        assert_eq!(queue.enqueue(SyncJob::new(campaign.clone())), EnqueueResult::Accepted);
    }
    let workers = start_workers(2, &queue, &index);
    let report = workers.shutdown(GRACE).await;
    assert!(report.drained());

    assert_eq!(index.document_count(CAMPAIGN_INDEX), 1);
    let doc = index.get_document(CAMPAIGN_INDEX, campaign.id.as_str()).unwrap();
    assert_eq!(doc, CampaignDocument::from(&campaign));
    teardown(db).await;
}

#[tokio::test]
async fn enqueue_never_waits_on_a_full_queue() {
    let db = prepare_test_env().await;
    let campaign = new_campaign(&db, "owner-4", "Night school").await;
    // No workers are consuming, so the queue fills up after ten jobs
    let queue = SyncQueue::new(10);
    let start = Instant::now();
    let results = (0..1000).map(|_| queue.enqueue(SyncJob::new(campaign.clone()))).collect::<Vec<_>>();
    assert!(start.elapsed() < Duration::from_secs(1));

    let accepted = results.iter().filter(|r| **r == EnqueueResult::Accepted).count();
    assert_eq!(accepted, 10);
    assert_eq!(queue.dropped_count(), 990);
    assert_eq!(queue.len(), 10);

    // Creating a campaign still succeeds while the queue is saturated
    let index = MemorySearchIndex::new();
    let api = campaign_api(&db, &index, &queue);
    let created = api.create_campaign(new_campaign_request("owner-4", "Overflow", "")).await.unwrap();
    assert_eq!(queue.dropped_count(), 991);
    assert!(api.fetch_campaign(&created.id).await.unwrap().is_some());
    teardown(db).await;
}

#[tokio::test]
async fn resync_repairs_a_dropped_job() {
    let db = prepare_test_env().await;
    let index = MemorySearchIndex::new();
    let queue = SyncQueue::new(1);
    let api = campaign_api(&db, &index, &queue);

    let first = api.create_campaign(new_campaign_request("owner-5", "First", "")).await.unwrap();
    let second = api.create_campaign(new_campaign_request("owner-5", "Second", "")).await.unwrap();
    assert_eq!(queue.dropped_count(), 1);

    let workers = start_workers(1, &queue, &index);
    // Wait for the first job to be picked up so that the resync has room in the queue
    let deadline = Instant::now() + GRACE;
    while index.document_count(CAMPAIGN_INDEX) < 1 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(index.get_document(CAMPAIGN_INDEX, second.id.as_str()).is_none());
    assert_eq!(api.resync_campaign(&second.id).await.unwrap(), EnqueueResult::Accepted);
    assert!(workers.shutdown(GRACE).await.drained());

    assert!(index.get_document(CAMPAIGN_INDEX, first.id.as_str()).is_some());
    assert!(index.get_document(CAMPAIGN_INDEX, second.id.as_str()).is_some());

    let err = api.resync_campaign(&CampaignId::random()).await.unwrap_err();
    assert!(matches!(err, CampaignApiError::CampaignNotFound(_)));
    teardown(db).await;
}

#[tokio::test]
async fn search_and_listing() {
    let db = prepare_test_env().await;
    let index = MemorySearchIndex::new();
    let queue = SyncQueue::new(100);
    let workers = start_workers(2, &queue, &index);
    let api = campaign_api(&db, &index, &queue);

    api.create_campaign(new_campaign_request("alice", "Clean water for all", "Wells in villages")).await.unwrap();
    api.create_campaign(new_campaign_request("alice", "School roof", "Fix the leaking roof")).await.unwrap();
    api.create_campaign(new_campaign_request("bob", "River cleanup", "Water quality matters")).await.unwrap();
    assert!(workers.shutdown(GRACE).await.drained());

    let page = api.search_campaigns("water", 1, 10).await.unwrap();
    assert_eq!(page.total, 2);
    let everything = api.search_campaigns("  ", 1, 10).await.unwrap();
    assert_eq!(everything.total, 3);
    let paged = api.search_campaigns("", 2, 2).await.unwrap();
    assert_eq!(paged.total, 3);
    assert_eq!(paged.documents.len(), 1);

    let alice = api.campaigns_for_user(&UserId::from("alice"), 1, 10).await.unwrap();
    assert_eq!(alice.total, 2);
    assert!(alice.documents.iter().all(|d| d.user_id == "alice"));
    let nobody = api.campaigns_for_user(&UserId::from("carol"), 1, 10).await.unwrap();
    assert_eq!(nobody.total, 0);

    assert!(matches!(api.search_campaigns("water", 0, 10).await, Err(CampaignApiError::InvalidPage(_))));
    assert!(matches!(api.search_campaigns("water", 1, 0).await, Err(CampaignApiError::InvalidPage(_))));
    assert!(matches!(api.search_campaigns("water", 1, 1000).await, Err(CampaignApiError::InvalidPage(_))));
    let huge = api.search_campaigns("water", usize::MAX, MAX_PAGE_SIZE).await;
    assert!(matches!(huge, Err(CampaignApiError::InvalidPage(_))));
    let huge = api.campaigns_for_user(&UserId::from("alice"), usize::MAX / 2, 10).await;
    assert!(matches!(huge, Err(CampaignApiError::InvalidPage(_))));
    teardown(db).await;
}

#[tokio::test]
async fn campaign_with_payments() {
    let db = prepare_test_env().await;
    let index = MemorySearchIndex::new();
    let queue = SyncQueue::new(10);
    let api = campaign_api(&db, &index, &queue);
    let settlements = SettlementApi::new(db.clone());

    let campaign = api.create_campaign(new_campaign_request("owner-6", "Ramp", "Wheelchair access")).await.unwrap();
    let empty = api.fetch_campaign_with_payments(&campaign.id).await.unwrap();
    assert!(empty.payments.is_empty());

    settlements.settle("cs_1", campaign.id.clone(), "p1".into(), "Gil", Amount::from(15)).await.unwrap();
    settlements.settle("cs_2", campaign.id.clone(), "p2".into(), "Hal", Amount::from(25)).await.unwrap();
    let full = api.fetch_campaign_with_payments(&campaign.id).await.unwrap();
    assert_eq!(full.campaign.amount_collected, Amount::from(40));
    let checkouts = full.payments.iter().map(|p| p.checkout_id.as_str()).collect::<Vec<_>>();
    assert_eq!(checkouts.len(), 2);
    assert!(checkouts.contains(&"cs_1") && checkouts.contains(&"cs_2"));

    let err = api.fetch_campaign_with_payments(&CampaignId::random()).await.unwrap_err();
    assert!(matches!(err, CampaignApiError::CampaignNotFound(_)));
    teardown(db).await;
}
