use std::{sync::Arc, time::Duration};

use fr_common::Secret;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::search::{CampaignDocument, SearchIndex, SearchIndexError, SearchPage, SearchQuery};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200`
    pub url: String,
    /// Optional API key, sent as `Authorization: ApiKey <key>`
    pub api_key: Option<Secret<String>>,
    /// Upper bound on any single HTTP round trip. The sync workers apply their own, usually tighter, deadline on top.
    pub request_timeout: Duration,
}

impl ElasticConfig {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self { url: url.into(), api_key: None, request_timeout: DEFAULT_REQUEST_TIMEOUT }
    }

    pub fn with_api_key(mut self, key: Secret<String>) -> Self {
        self.api_key = Some(key);
        self
    }
}

/// A [`SearchIndex`] backed by an Elasticsearch cluster, using its REST API.
#[derive(Clone)]
pub struct ElasticsearchIndex {
    config: ElasticConfig,
    client: Arc<Client>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    total: Total,
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Total {
    value: u64,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: CampaignDocument,
}

impl ElasticsearchIndex {
    pub fn new(config: ElasticConfig) -> Result<Self, SearchIndexError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let val = HeaderValue::from_str(&format!("ApiKey {}", key.reveal()))
                .map_err(|e| SearchIndexError::Initialization(e.to_string()))?;
            headers.insert(AUTHORIZATION, val);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SearchIndexError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.url.trim_end_matches('/'))
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, SearchIndexError> {
        let url = self.url(path);
        trace!("🔍️ Sending request: {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await.map_err(|e| SearchIndexError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🔍️ Request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| SearchIndexError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| SearchIndexError::RequestError(e.to_string()))?;
            Err(SearchIndexError::QueryError { status, message })
        }
    }

    /// Checks that the cluster is reachable.
    pub async fn ping(&self) -> Result<(), SearchIndexError> {
        let info = self.rest_query::<Value, ()>(Method::GET, "/", &[], None).await?;
        info!("🔍️ Connected to Elasticsearch at {} (version {})", self.config.url, info["version"]["number"]);
        Ok(())
    }
}

/// Builds the `_search` request body for a campaign query.
pub(crate) fn search_body(query: &SearchQuery) -> Value {
    let mut must = Vec::with_capacity(2);
    if let Some(keyword) = &query.keyword {
        must.push(json!({
            "multi_match": {
                "query": keyword,
                "fields": ["title", "description"],
                "type": "best_fields"
            }
        }));
    }
    if let Some(user_id) = &query.user_id {
        must.push(json!({ "match": { "user_id": user_id } }));
    }
    let es_query = match must.len() {
        0 => json!({ "match_all": {} }),
        1 => must.remove(0),
        _ => json!({ "bool": { "must": must } }),
    };
    json!({
        "query": es_query,
        "from": query.from,
        "size": query.size,
        "sort": [{ "created_at": { "order": query.sort.as_str() } }],
        "track_total_hits": true
    })
}

impl SearchIndex for ElasticsearchIndex {
    async fn upsert_document(&self, index: &str, id: &str, document: &CampaignDocument) -> Result<(), SearchIndexError> {
        let path = format!("/{index}/_doc/{id}");
        let result = self.rest_query::<Value, _>(Method::PUT, &path, &[("refresh", "false")], Some(document)).await?;
        trace!("🔍️ Document {id} indexed in '{index}': {}", result["result"]);
        Ok(())
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchPage, SearchIndexError> {
        let path = format!("/{index}/_search");
        let body = search_body(query);
        trace!("🔍️ Searching '{index}' with {body}");
        let response = self.rest_query::<SearchResponse, _>(Method::POST, &path, &[], Some(&body)).await?;
        let documents = response.hits.hits.into_iter().map(|h| h.source).collect();
        Ok(SearchPage { total: response.hits.total.value, documents })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::search::SortOrder;

    #[test]
    fn empty_query_matches_all() {
        let body = search_body(&SearchQuery::default().with_page(2, 5));
        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(body["from"], 5);
        assert_eq!(body["size"], 5);
        assert_eq!(body["sort"][0]["created_at"]["order"], "desc");
    }

    #[test]
    fn keyword_query_is_multi_match() {
        let body = search_body(&SearchQuery::default().with_keyword("water"));
        assert_eq!(body["query"]["multi_match"]["query"], "water");
        assert_eq!(body["query"]["multi_match"]["fields"], json!(["title", "description"]));
        assert_eq!(body["query"]["multi_match"]["type"], "best_fields");
    }

    #[test]
    fn owner_filter_combines_with_keyword() {
        let q = SearchQuery::default().with_user_id("u1");
        let body = search_body(&q);
        assert_eq!(body["query"], json!({ "match": { "user_id": "u1" } }));

        let q = SearchQuery::default().with_user_id("u1").with_keyword("lamps").with_sort(SortOrder::Ascending);
        let body = search_body(&q);
        assert_eq!(body["query"]["bool"]["must"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["sort"][0]["created_at"]["order"], "asc");
    }

    #[test]
    fn parses_search_response() {
        let raw = json!({
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [{
                    "_id": "c1",
                    "_source": {
                        "id": "c1", "user_id": "u1", "username": "alice", "title": "Wells", "description": "",
                        "image": "", "target": 1000, "amount_collected": 80,
                        "deadline": "2024-07-01T00:00:00Z", "created_at": "2024-06-01T00:00:00Z",
                        "updated_at": "2024-06-02T00:00:00Z"
                    }
                }]
            }
        });
        let response: SearchResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.hits.total.value, 1);
        assert_eq!(response.hits.hits[0].source.amount_collected.value(), 80);
    }

    #[test]
    fn urls_are_joined_without_double_slashes() {
        let index = ElasticsearchIndex::new(ElasticConfig::new("http://localhost:9200/")).unwrap();
        assert_eq!(index.url("/campaigns/_doc/c1"), "http://localhost:9200/campaigns/_doc/c1");
    }
}
