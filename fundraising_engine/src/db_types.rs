use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use fr_common::Amount;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Invalid identifier: {0}")]
pub struct InvalidIdError(String);

//--------------------------------------     CampaignId      ---------------------------------------------------------
/// Opaque, globally unique campaign identifier. New ids are random UUIDs, but any non-empty string read back from the
/// store is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for CampaignId {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InvalidIdError("campaign id cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------       UserId        ---------------------------------------------------------
/// Reference to a platform user (campaign owner or payer). User records themselves are managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub String);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

//--------------------------------------      Campaign       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub user_id: UserId,
    pub username: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub target: Amount,
    pub amount_collected: Amount,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewCampaign     ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub user_id: UserId,
    pub username: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub target: Amount,
    pub deadline: DateTime<Utc>,
}

impl NewCampaign {
    pub fn new<S: Into<String>>(user_id: UserId, title: S, target: Amount, deadline: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username: String::default(),
            title: title.into(),
            description: String::default(),
            image: String::default(),
            target,
            deadline,
        }
    }

    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = image.into();
        self
    }
}

//--------------------------------------    PaymentRecord    ---------------------------------------------------------
/// A settled payment. There is at most one record per `checkout_id`, and records are never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub username: String,
    pub checkout_id: String,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     NewPayment      ---------------------------------------------------------
/// A payment confirmation received from the external payment provider, waiting to be settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub checkout_id: String,
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub username: String,
    pub amount: Amount,
}

impl NewPayment {
    pub fn new<S: Into<String>>(checkout_id: S, campaign_id: CampaignId, user_id: UserId, amount: Amount) -> Self {
        Self { checkout_id: checkout_id.into(), campaign_id, user_id, username: String::default(), amount }
    }

    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = username.into();
        self
    }
}

//--------------------------------------       SyncJob       ---------------------------------------------------------
/// An immutable snapshot of a campaign, captured when it is handed to the sync queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    snapshot: Campaign,
}

impl SyncJob {
    pub fn new(snapshot: Campaign) -> Self {
        Self { snapshot }
    }

    pub fn campaign_id(&self) -> &CampaignId {
        &self.snapshot.id
    }

    pub fn snapshot(&self) -> &Campaign {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Campaign {
        self.snapshot
    }
}

impl From<Campaign> for SyncJob {
    fn from(snapshot: Campaign) -> Self {
        Self::new(snapshot)
    }
}
