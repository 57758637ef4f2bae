use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Amount, Campaign, CampaignId, NewCampaign},
};

const CAMPAIGN_COLUMNS: &str = "id, user_id, username, title, description, image, target, amount_collected, deadline, \
                                created_at, updated_at";

/// Inserts a new campaign using the given connection. This is not atomic with respect to other calls. Embed it inside a
/// transaction and pass `&mut *tx` if it needs to be part of a larger unit of work.
pub async fn insert_campaign(
    campaign: NewCampaign,
    conn: &mut SqliteConnection,
) -> Result<Campaign, SqliteDatabaseError> {
    let id = CampaignId::random();
    let now = Utc::now();
    let sql = format!(
        r#"
        INSERT INTO campaigns (id, user_id, username, title, description, image, target, amount_collected, deadline,
            created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $9)
        RETURNING {CAMPAIGN_COLUMNS};
        "#
    );
    let record = sqlx::query_as::<_, Campaign>(&sql)
        .bind(id)
        .bind(campaign.user_id)
        .bind(campaign.username)
        .bind(campaign.title)
        .bind(campaign.description)
        .bind(campaign.image)
        .bind(campaign.target)
        .bind(campaign.deadline)
        .bind(now)
        .fetch_one(conn)
        .await?;
    trace!("🗃️ Campaign {} inserted", record.id);
    Ok(record)
}

pub async fn fetch_campaign(id: &CampaignId, conn: &mut SqliteConnection) -> Result<Option<Campaign>, SqliteDatabaseError> {
    let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1");
    let campaign = sqlx::query_as::<_, Campaign>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(campaign)
}

/// Adds `delta` to the campaign's `amount_collected` with a single `UPDATE ... SET x = x + delta` statement, so that
/// the database serialises concurrent increments rather than the application. Returns the updated row, or `None` if
/// there is no such campaign.
pub async fn increment_amount_collected(
    id: &CampaignId,
    delta: Amount,
    conn: &mut SqliteConnection,
) -> Result<Option<Campaign>, SqliteDatabaseError> {
    let sql = format!(
        r#"
        UPDATE campaigns SET
            amount_collected = amount_collected + $1,
            updated_at = $2
        WHERE id = $3
        RETURNING {CAMPAIGN_COLUMNS};
        "#
    );
    let campaign = sqlx::query_as::<_, Campaign>(&sql)
        .bind(delta)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await?;
    match &campaign {
        Some(c) => trace!("🗃️ Campaign {id} amount collected is now {}", c.amount_collected),
        None => trace!("🗃️ Campaign {id} does not exist. Nothing to increment"),
    }
    Ok(campaign)
}
