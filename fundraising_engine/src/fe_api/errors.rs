use std::time::Duration;

use thiserror::Error;

use crate::{
    db::traits::PrimaryStore,
    db_types::{Amount, CampaignId},
    search::SearchIndexError,
};

#[derive(Debug, Error)]
pub enum SettlementError<B: PrimaryStore> {
    #[error("Database error: {0}")]
    DatabaseError(B::Error),
    #[error("Campaign {0} does not exist")]
    CampaignNotFound(CampaignId),
    #[error("Payment amounts must be strictly positive, but {0} was given")]
    InvalidAmount(Amount),
    #[error("A payment confirmation must carry a checkout id")]
    InvalidCheckoutId,
    #[error("The primary store did not respond within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum CampaignApiError<B: PrimaryStore> {
    #[error("Database error: {0}")]
    DatabaseError(B::Error),
    #[error("Search index error: {0}")]
    SearchError(#[from] SearchIndexError),
    #[error("Campaign {0} does not exist")]
    CampaignNotFound(CampaignId),
    #[error("The {0} did not respond within {1:?}")]
    Timeout(&'static str, Duration),
    #[error("Invalid page request: {0}")]
    InvalidPage(String),
}
