use std::future::Future;

use crate::{
    db::traits::{InsertPaymentResult, SettlementResult},
    db_types::{Amount, Campaign, CampaignId, NewCampaign, NewPayment, PaymentRecord},
};

/// This trait defines the behaviour a storage backend must provide to act as the primary store for the fundraising
/// engine.
///
/// This behaviour includes:
/// * Creating and fetching campaigns
/// * Atomically maintaining the `amount_collected` aggregate of a campaign
/// * Recording payments exactly once per checkout id
pub trait PrimaryStore: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a brand-new campaign. A fresh id is assigned, `amount_collected` starts at zero, and the created record
    /// is returned.
    fn insert_campaign(&self, campaign: NewCampaign) -> impl Future<Output = Result<Campaign, Self::Error>> + Send;

    /// Fetches the campaign with the given id. Returns `None` if it does not exist.
    fn fetch_campaign(&self, id: &CampaignId) -> impl Future<Output = Result<Option<Campaign>, Self::Error>> + Send;

    /// Fetches the payment recorded for the given external checkout id, if any.
    fn fetch_payment_by_checkout_id(
        &self,
        checkout_id: &str,
    ) -> impl Future<Output = Result<Option<PaymentRecord>, Self::Error>> + Send;

    /// All payments made to the given campaign, oldest first.
    fn fetch_payments_for_campaign(
        &self,
        id: &CampaignId,
    ) -> impl Future<Output = Result<Vec<PaymentRecord>, Self::Error>> + Send;

    /// Writes the payment record if, and only if, no record with the same checkout id exists. The check and the write
    /// are a single atomic operation.
    fn insert_payment_if_absent(
        &self,
        payment: NewPayment,
    ) -> impl Future<Output = Result<InsertPaymentResult, Self::Error>> + Send;

    /// Atomically adds `delta` to the campaign's `amount_collected` and returns the updated campaign, or `None` if the
    /// campaign does not exist.
    ///
    /// Concurrent calls never lose updates: after any interleaving the aggregate equals the initial value plus the sum
    /// of all deltas.
    fn increment_amount_collected(
        &self,
        id: &CampaignId,
        delta: Amount,
    ) -> impl Future<Output = Result<Option<Campaign>, Self::Error>> + Send;

    /// Takes a payment confirmation, and in a single atomic transaction,
    /// * inserts the payment record if no record exists for its checkout id. If one already exists, nothing further
    ///   is done and [`SettlementResult::AlreadyApplied`] is returned.
    /// * adds the payment amount to the owning campaign's `amount_collected`.
    ///
    /// If the campaign does not exist, nothing is written and [`SettlementResult::UnknownCampaign`] is returned.
    /// Either both writes are committed or neither is.
    fn settle_payment(&self, payment: NewPayment)
        -> impl Future<Output = Result<SettlementResult, Self::Error>> + Send;

    /// Closes the database connection.
    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async { Ok(()) }
    }
}
