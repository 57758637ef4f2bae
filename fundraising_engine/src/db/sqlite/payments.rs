use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertPaymentResult},
    db_types::{CampaignId, NewPayment, PaymentRecord},
};

const PAYMENT_COLUMNS: &str = "id, campaign_id, user_id, username, checkout_id, amount, created_at";

/// Inserts the payment unless a payment with the same checkout id already exists.
///
/// The unique index on `checkout_id` makes the insert itself the existence check. Of two concurrent callers with the
/// same checkout id, exactly one gets `Inserted`.
pub async fn idempotent_insert(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<InsertPaymentResult, SqliteDatabaseError> {
    let checkout_id = payment.checkout_id.clone();
    let campaign_id = payment.campaign_id.clone();
    let sql = format!(
        r#"
        INSERT INTO payments (id, campaign_id, user_id, username, checkout_id, amount, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {PAYMENT_COLUMNS};
        "#
    );
    let result = sqlx::query_as::<_, PaymentRecord>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(payment.campaign_id)
        .bind(payment.user_id)
        .bind(payment.username)
        .bind(payment.checkout_id)
        .bind(payment.amount)
        .bind(Utc::now())
        .fetch_one(conn)
        .await;
    match result {
        Ok(record) => {
            trace!("🗃️ Payment for checkout {checkout_id} inserted with id {}", record.id);
            Ok(InsertPaymentResult::Inserted(record))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(InsertPaymentResult::AlreadyExists(checkout_id)),
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            Err(SqliteDatabaseError::CampaignNotFound(campaign_id.to_string()))
        },
        Err(e) => Err(SqliteDatabaseError::from(e)),
    }
}

pub async fn fetch_payment_by_checkout_id(
    checkout_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, SqliteDatabaseError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE checkout_id = $1");
    let payment = sqlx::query_as::<_, PaymentRecord>(&sql).bind(checkout_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payments_for_campaign(
    campaign_id: &CampaignId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRecord>, SqliteDatabaseError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE campaign_id = $1 ORDER BY created_at ASC, id ASC");
    let payments = sqlx::query_as::<_, PaymentRecord>(&sql).bind(campaign_id).fetch_all(conn).await?;
    Ok(payments)
}
