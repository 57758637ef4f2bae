use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{campaigns, new_pool, payments, SqliteDatabaseError};
use crate::{
    db::traits::{InsertPaymentResult, PrimaryStore, SettlementResult},
    db_types::{Amount, Campaign, CampaignId, NewCampaign, NewPayment, PaymentRecord},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PrimaryStore for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_campaign(&self, campaign: NewCampaign) -> Result<Campaign, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let campaign = campaigns::insert_campaign(campaign, &mut conn).await?;
        debug!("🗃️ Campaign {} [{}] has been saved in the DB", campaign.id, campaign.title);
        Ok(campaign)
    }

    async fn fetch_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        campaigns::fetch_campaign(id, &mut conn).await
    }

    async fn fetch_payment_by_checkout_id(&self, checkout_id: &str) -> Result<Option<PaymentRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment_by_checkout_id(checkout_id, &mut conn).await
    }

    async fn fetch_payments_for_campaign(&self, id: &CampaignId) -> Result<Vec<PaymentRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_for_campaign(id, &mut conn).await
    }

    async fn insert_payment_if_absent(&self, payment: NewPayment) -> Result<InsertPaymentResult, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::idempotent_insert(payment, &mut conn).await
    }

    async fn increment_amount_collected(&self, id: &CampaignId, delta: Amount) -> Result<Option<Campaign>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        campaigns::increment_amount_collected(id, delta, &mut conn).await
    }

    /// Takes a payment confirmation, and in a single atomic transaction,
    /// * inserts the payment record. If a record for the checkout id already exists, the transaction is rolled back
    ///   and nothing further is done.
    /// * credits the payment amount to the campaign's `amount_collected`. If the campaign does not exist, the
    ///   transaction is rolled back.
    ///
    /// Returns the new payment record and the updated campaign.
    async fn settle_payment(&self, payment: NewPayment) -> Result<SettlementResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let checkout_id = payment.checkout_id.clone();
        let campaign_id = payment.campaign_id.clone();
        let amount = payment.amount;
        let record = match payments::idempotent_insert(payment, &mut tx).await {
            Ok(InsertPaymentResult::Inserted(record)) => record,
            Ok(InsertPaymentResult::AlreadyExists(id)) => {
                tx.rollback().await?;
                debug!("🗃️ Checkout {id} has already been settled. No action to take");
                return Ok(SettlementResult::AlreadyApplied(id));
            },
            Err(SqliteDatabaseError::CampaignNotFound(_)) => {
                tx.rollback().await?;
                warn!("🗃️ Checkout {checkout_id} refers to campaign {campaign_id}, which does not exist");
                return Ok(SettlementResult::UnknownCampaign(campaign_id));
            },
            Err(e) => return Err(e),
        };
        debug!("🗃️ Payment {} for checkout {checkout_id} received for campaign {campaign_id}", record.id);
        let Some(campaign) = campaigns::increment_amount_collected(&campaign_id, amount, &mut tx).await? else {
            tx.rollback().await?;
            warn!("🗃️ Campaign {campaign_id} disappeared while settling checkout {checkout_id}");
            return Ok(SettlementResult::UnknownCampaign(campaign_id));
        };
        tx.commit().await?;
        debug!(
            "🗃️ Checkout {checkout_id} settled. {amount} credited to campaign {campaign_id}, which has now collected {}",
            campaign.amount_collected
        );
        Ok(SettlementResult::Applied { payment: record, campaign })
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date using the embedded migration scripts.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
