use std::{fmt::Debug, time::Duration};

use log::*;
use tokio::time::timeout;

use super::{aggregate_updater::AggregateUpdater, errors::SettlementError};
use crate::{
    db::traits::{PrimaryStore, SettlementResult},
    db_types::{Amount, Campaign, CampaignId, NewPayment, PaymentRecord, UserId},
    sync::SyncQueue,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The payment was recorded and credited to the campaign.
    Settled { payment: PaymentRecord, campaign: Campaign },
    /// A payment for this checkout id had already been settled. Nothing was changed.
    AlreadySettled(String),
}

impl SettlementOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, SettlementOutcome::Settled { .. })
    }
}

/// `SettlementApi` applies payment confirmations from the external payment provider.
///
/// Confirmations are delivered at least once, and possibly several times concurrently. Each checkout id is applied
/// exactly once: the payment record and the campaign total are written together, and any later confirmation for the
/// same checkout id is acknowledged without touching the campaign. Retrying after an error is always safe.
pub struct SettlementApi<B> {
    db: B,
    aggregate: AggregateUpdater<B>,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B: Clone> SettlementApi<B> {
    pub fn new(db: B) -> Self {
        let aggregate = AggregateUpdater::new(db.clone());
        Self { db, aggregate }
    }

    /// Push the updated campaign to the search sync queue after every settlement.
    pub fn with_sync_queue(mut self, queue: SyncQueue) -> Self {
        self.aggregate = self.aggregate.with_sync_queue(queue);
        self
    }

    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.aggregate = self.aggregate.with_storage_timeout(storage_timeout);
        self
    }
}

impl<B> SettlementApi<B>
where B: PrimaryStore
{
    /// Settle a confirmed checkout session for the given campaign.
    pub async fn settle(
        &self,
        checkout_id: &str,
        campaign_id: CampaignId,
        payer_id: UserId,
        payer_name: &str,
        amount: Amount,
    ) -> Result<SettlementOutcome, SettlementError<B>> {
        let payment = NewPayment::new(checkout_id, campaign_id, payer_id, amount).with_username(payer_name);
        self.settle_payment(payment).await
    }

    /// Settle a payment confirmation.
    ///
    /// The amount must be strictly positive and the checkout id must not be blank. Both are checked before the store
    /// is touched. Surrounding whitespace is stripped from the checkout id, so `" abc"` and `"abc"` settle once.
    pub async fn settle_payment(&self, mut payment: NewPayment) -> Result<SettlementOutcome, SettlementError<B>> {
        payment.checkout_id = payment.checkout_id.trim().to_string();
        if !payment.amount.is_positive() {
            warn!("💰️ Rejecting checkout {} with a non-positive amount of {}", payment.checkout_id, payment.amount);
            return Err(SettlementError::InvalidAmount(payment.amount));
        }
        if payment.checkout_id.is_empty() {
            warn!("💰️ Rejecting a payment for campaign {} without a checkout id", payment.campaign_id);
            return Err(SettlementError::InvalidCheckoutId);
        }
        let checkout_id = payment.checkout_id.clone();
        let deadline = self.aggregate.storage_timeout();
        trace!("💰️ Settling checkout {checkout_id} ({} for campaign {})", payment.amount, payment.campaign_id);
        let result = timeout(deadline, self.db.settle_payment(payment))
            .await
            .map_err(|_| {
                error!("💰️ Settlement of checkout {checkout_id} did not complete within {deadline:?}");
                SettlementError::Timeout(deadline)
            })?
            .map_err(|e| {
                error!("💰️ Settlement of checkout {checkout_id} failed. {e}");
                SettlementError::DatabaseError(e)
            })?;
        match result {
            SettlementResult::Applied { payment, campaign } => {
                info!(
                    "💰️ Checkout {checkout_id} settled. Campaign {} has collected {} of {}",
                    campaign.id, campaign.amount_collected, campaign.target
                );
                self.aggregate.publish_change(&campaign);
                Ok(SettlementOutcome::Settled { payment, campaign })
            },
            SettlementResult::AlreadyApplied(id) => {
                info!("💰️ Checkout {id} was already settled. Ignoring the repeat confirmation");
                Ok(SettlementOutcome::AlreadySettled(id))
            },
            SettlementResult::UnknownCampaign(campaign_id) => Err(SettlementError::CampaignNotFound(campaign_id)),
        }
    }

    /// Fetch the payment recorded for a checkout id, if it has been settled.
    pub async fn payment_for_checkout(&self, checkout_id: &str) -> Result<Option<PaymentRecord>, SettlementError<B>> {
        let deadline = self.aggregate.storage_timeout();
        timeout(deadline, self.db.fetch_payment_by_checkout_id(checkout_id))
            .await
            .map_err(|_| SettlementError::Timeout(deadline))?
            .map_err(SettlementError::DatabaseError)
    }
}
