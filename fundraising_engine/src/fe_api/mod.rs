//! # Fundraising engine public API
//!
//! The `fe_api` module exposes the programmatic API for the fundraising engine.
//!
//! * [`campaign_api`] creates and reads campaigns, searches the campaign index, and feeds the search sync queue.
//! * [`settlement_api`] applies payment confirmations exactly once per checkout id.
//! * [`aggregate_updater`] maintains each campaign's collected total under concurrent updates.
//!
//! # API usage
//!
//! Every API is created by supplying a backend that implements [`crate::db::traits::PrimaryStore`] (and, for
//! [`CampaignApi`], a [`crate::search::SearchIndex`]). Nothing is global, so several engines can share a process.
//!
//! ```rust,ignore
//! use fundraising_engine::{SettlementApi, SqliteDatabase, SyncQueue};
//! let db = SqliteDatabase::new_with_url("sqlite://data/fundraising.db", 25).await?;
//! let api = SettlementApi::new(db).with_sync_queue(SyncQueue::default());
//! let outcome = api.settle("cs_123", campaign_id, "user-1".into(), "Alice", Amount::from(50)).await?;
//! ```

pub mod aggregate_updater;
pub mod campaign_api;
pub mod errors;
pub mod settlement_api;

pub use aggregate_updater::{AggregateUpdater, DEFAULT_STORAGE_TIMEOUT};
pub use campaign_api::{CampaignApi, CampaignWithPayments, MAX_PAGE_SIZE};
pub use errors::{CampaignApiError, SettlementError};
pub use settlement_api::{SettlementApi, SettlementOutcome};
