use crate::db_types::{Campaign, CampaignId, PaymentRecord};

/// Outcome of a conditional (insert-if-absent) payment write.
#[derive(Debug, Clone)]
pub enum InsertPaymentResult {
    Inserted(PaymentRecord),
    AlreadyExists(String),
}

/// Outcome of applying a payment confirmation to the store.
#[derive(Debug, Clone)]
pub enum SettlementResult {
    /// The payment record was created and the campaign aggregate credited, in the same transaction.
    Applied { payment: PaymentRecord, campaign: Campaign },
    /// A payment for this checkout id already exists. Nothing was changed.
    AlreadyApplied(String),
    /// The payment refers to a campaign that does not exist. Nothing was changed.
    UnknownCampaign(CampaignId),
}
