//! Fundraising Engine
//!
//! This library contains the core logic for the fundraising platform back end. It is independent of any web framework.
//!
//! The library is divided into the following sections:
//! 1. Storage ([`mod@db`]). The primary store is the system of record for campaigns and payments. SQLite is the
//!    supported backend. The data types stored in the database are defined in [`mod@db_types`] and are public.
//! 2. Search ([`mod@search`]). A denormalised, eventually consistent copy of the campaigns, used for listings and
//!    keyword search.
//! 3. Search sync ([`mod@sync`]). A bounded queue and a pool of background workers that copy campaign snapshots from
//!    the primary store into the search index without slowing down the request path.
//! 4. The public API ([`mod@fe_api`]). Campaign creation and search, idempotent payment settlement, and the campaign
//!    total updater.
//!
//! [`FundraisingEngine`] wires all of these together for callers that want a single handle.
pub mod config;
pub mod db;
pub mod db_types;
pub mod engine;
pub mod fe_api;
pub mod search;
pub mod sync;

pub use config::EngineConfig;
#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{InsertPaymentResult, PrimaryStore, SettlementResult};
pub use engine::FundraisingEngine;
pub use fe_api::{
    AggregateUpdater,
    CampaignApi,
    CampaignApiError,
    CampaignWithPayments,
    SettlementApi,
    SettlementError,
    SettlementOutcome,
};
pub use search::{ElasticConfig, ElasticsearchIndex, MemorySearchIndex, SearchIndex};
pub use sync::{EnqueueResult, ShutdownReport, SyncQueue, SyncWorkerPool};
