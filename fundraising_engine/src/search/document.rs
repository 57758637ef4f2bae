use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Amount, Campaign};

/// The search-index representation of a campaign. It carries the same fields as the stored campaign, flattened to
/// plain strings so that any search backend can index them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDocument {
    pub id: String,
    pub user_id: String,
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

impl From<&Campaign> for CampaignDocument {
    fn from(c: &Campaign) -> Self {
        Self {
            id: c.id.to_string(),
            user_id: c.user_id.to_string(),
            username: c.username.clone(),
            title: c.title.clone(),
            description: c.description.clone(),
            image: c.image.clone(),
            target: c.target,
            amount_collected: c.amount_collected,
            deadline: c.deadline,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<Campaign> for CampaignDocument {
    fn from(c: Campaign) -> Self {
        Self::from(&c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// A campaign search request. All criteria are optional; an empty query matches every document.
///
/// Results are always sorted on `created_at`, newest first unless the order is overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub user_id: Option<String>,
    pub from: usize,
    pub size: usize,
    pub sort: SortOrder,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self { keyword: None, user_id: None, from: 0, size: 10, sort: SortOrder::Descending }
    }
}

impl SearchQuery {
    /// Free-text match against the title and description. Blank keywords are ignored.
    pub fn with_keyword<S: Into<String>>(mut self, keyword: S) -> Self {
        let keyword = keyword.into();
        self.keyword = if keyword.trim().is_empty() { None } else { Some(keyword.trim().to_string()) };
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets `from` and `size` from a 1-based page number. Page numbers below 1 are treated as page 1, and offsets past
    /// `usize::MAX` are clamped.
    pub fn with_page(mut self, page: usize, per_page: usize) -> Self {
        self.from = page.saturating_sub(1).saturating_mul(per_page);
        self.size = per_page;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchPage {
    pub total: u64,
    pub documents: Vec<CampaignDocument>,
}

impl SearchPage {
    pub fn find(&self, id: &str) -> Option<&CampaignDocument> {
        self.documents.iter().find(|d| d.id == id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn paging() {
        let q = SearchQuery::default().with_page(3, 20);
        assert_eq!(q.from, 40);
        assert_eq!(q.size, 20);
        let q = SearchQuery::default().with_page(0, 20);
        assert_eq!(q.from, 0);
        let q = SearchQuery::default().with_page(usize::MAX, 100);
        assert_eq!(q.from, usize::MAX);
    }

    #[test]
    fn blank_keywords_are_dropped() {
        assert_eq!(SearchQuery::default().with_keyword("   ").keyword, None);
        assert_eq!(SearchQuery::default().with_keyword(" water ").keyword.as_deref(), Some("water"));
    }
}
