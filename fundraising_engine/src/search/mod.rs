//! # Search index
//!
//! The search index holds a denormalised, eventually consistent copy of every campaign. It has no write authority of
//! its own: documents only ever arrive through the sync workers, keyed by campaign id, so re-sending a snapshot always
//! converges on the same document.
//!
//! Two backends are provided:
//! * [`MemorySearchIndex`], an in-process index used in tests and when no search cluster is configured.
//! * [`ElasticsearchIndex`], which talks to an Elasticsearch cluster over its REST API.
mod document;
mod elastic;
mod errors;
mod memory;

use std::future::Future;

pub use document::{CampaignDocument, SearchPage, SearchQuery, SortOrder};
pub use elastic::{ElasticConfig, ElasticsearchIndex};
pub use errors::SearchIndexError;
pub use memory::MemorySearchIndex;

/// The name of the index that campaign documents are written to.
pub const CAMPAIGN_INDEX: &str = "campaigns";

/// Behaviour required of a search backend.
pub trait SearchIndex: Clone + Send + Sync + 'static {
    /// Inserts the document if no document with this id exists in `index`, or replaces it entirely otherwise.
    fn upsert_document(
        &self,
        index: &str,
        id: &str,
        document: &CampaignDocument,
    ) -> impl Future<Output = Result<(), SearchIndexError>> + Send;

    /// Runs a query and returns the total number of hits along with the requested page of documents.
    fn search(&self, index: &str, query: &SearchQuery)
        -> impl Future<Output = Result<SearchPage, SearchIndexError>> + Send;
}
