use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::*;

use crate::search::{CampaignDocument, SearchIndex, SearchIndexError, SearchPage, SearchQuery, SortOrder};

type Indices = HashMap<String, HashMap<String, CampaignDocument>>;

/// An in-process search index. Clones share the same underlying storage.
#[derive(Clone, Default)]
pub struct MemorySearchIndex {
    indices: Arc<RwLock<Indices>>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of documents held in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        self.indices.read().map(|i| i.get(index).map(HashMap::len).unwrap_or_default()).unwrap_or_default()
    }

    /// Fetches a single document by id.
    pub fn get_document(&self, index: &str, id: &str) -> Option<CampaignDocument> {
        self.indices.read().ok().and_then(|i| i.get(index).and_then(|docs| docs.get(id).cloned()))
    }
}

fn matches(doc: &CampaignDocument, query: &SearchQuery) -> bool {
    if let Some(user_id) = &query.user_id {
        if &doc.user_id != user_id {
            return false;
        }
    }
    match &query.keyword {
        None => true,
        Some(keyword) => {
            let title = doc.title.to_lowercase();
            let description = doc.description.to_lowercase();
            keyword
                .to_lowercase()
                .split_whitespace()
                .any(|term| title.contains(term) || description.contains(term))
        },
    }
}

impl SearchIndex for MemorySearchIndex {
    async fn upsert_document(&self, index: &str, id: &str, document: &CampaignDocument) -> Result<(), SearchIndexError> {
        let mut indices =
            self.indices.write().map_err(|e| SearchIndexError::RequestError(format!("Index lock poisoned. {e}")))?;
        let replaced = indices.entry(index.to_string()).or_default().insert(id.to_string(), document.clone());
        trace!("🔍️ Document {id} {} in memory index '{index}'", if replaced.is_some() { "replaced" } else { "added" });
        Ok(())
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchPage, SearchIndexError> {
        let indices =
            self.indices.read().map_err(|e| SearchIndexError::RequestError(format!("Index lock poisoned. {e}")))?;
        let mut hits = indices
            .get(index)
            .map(|docs| docs.values().filter(|d| matches(d, query)).cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        hits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        if query.sort == SortOrder::Descending {
            hits.reverse();
        }
        let total = hits.len() as u64;
        let documents = hits.into_iter().skip(query.from).take(query.size).collect();
        Ok(SearchPage { total, documents })
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::{db_types::Amount, search::CAMPAIGN_INDEX};

    fn doc(id: &str, user: &str, title: &str, description: &str, age_days: i64) -> CampaignDocument {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() - Duration::days(age_days);
        CampaignDocument {
            id: id.to_string(),
            user_id: user.to_string(),
            username: format!("{user}-name"),
            title: title.to_string(),
            description: description.to_string(),
            image: String::default(),
            target: Amount::from(1000),
            amount_collected: Amount::from(0),
            deadline: created + Duration::days(30),
            created_at: created,
            updated_at: created,
        }
    }

    async fn seeded() -> MemorySearchIndex {
        let index = MemorySearchIndex::new();
        let docs = [
            doc("c1", "alice", "Water wells", "Drill wells in dry villages", 3),
            doc("c2", "bob", "School books", "Textbooks for rural schools", 2),
            doc("c3", "alice", "Solar lamps", "Light for study after dark", 1),
        ];
        for d in docs {
            index.upsert_document(CAMPAIGN_INDEX, &d.id.clone(), &d).await.unwrap();
        }
        index
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let index = MemorySearchIndex::new();
        let mut d = doc("c1", "alice", "Water wells", "", 0);
        index.upsert_document(CAMPAIGN_INDEX, "c1", &d).await.unwrap();
        index.upsert_document(CAMPAIGN_INDEX, "c1", &d).await.unwrap();
        assert_eq!(index.document_count(CAMPAIGN_INDEX), 1);
        d.amount_collected = Amount::from(80);
        index.upsert_document(CAMPAIGN_INDEX, "c1", &d).await.unwrap();
        assert_eq!(index.document_count(CAMPAIGN_INDEX), 1);
        assert_eq!(index.get_document(CAMPAIGN_INDEX, "c1"), Some(d));
    }

    #[tokio::test]
    async fn match_all_sorted_newest_first() {
        let index = seeded().await;
        let page = index.search(CAMPAIGN_INDEX, &SearchQuery::default()).await.unwrap();
        assert_eq!(page.total, 3);
        let ids = page.documents.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["c3", "c2", "c1"]);
        let asc = SearchQuery::default().with_sort(SortOrder::Ascending);
        let page = index.search(CAMPAIGN_INDEX, &asc).await.unwrap();
        assert_eq!(page.documents[0].id, "c1");
    }

    #[tokio::test]
    async fn keyword_and_owner_filters() {
        let index = seeded().await;
        let q = SearchQuery::default().with_keyword("WELLS");
        let page = index.search(CAMPAIGN_INDEX, &q).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.find("c1").is_some());

        let q = SearchQuery::default().with_keyword("study books");
        assert_eq!(index.search(CAMPAIGN_INDEX, &q).await.unwrap().total, 2);

        let q = SearchQuery::default().with_user_id("alice");
        let page = index.search(CAMPAIGN_INDEX, &q).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.documents.iter().all(|d| d.user_id == "alice"));
    }

    #[tokio::test]
    async fn paging_reports_full_total() {
        let index = seeded().await;
        let q = SearchQuery::default().with_page(2, 2);
        let page = index.search(CAMPAIGN_INDEX, &q).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.documents.len(), 1);
        assert_eq!(page.documents[0].id, "c1");
        let empty = index.search("no-such-index", &SearchQuery::default()).await.unwrap();
        assert_eq!(empty, SearchPage::default());
    }
}
