//! OpenSearch / Elasticsearch `_search` client.
//!
//! Translates `SearchRequest` into the JSON query DSL and parses hits back.
//! Timeouts are owned here; context fetches impose none of their own.

use super::{Filter, SearchHit, SearchRequest, SearchResponse, SearchSource, TimeRange};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::sort::SortClause;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

/// HTTP search backend
pub struct HttpSearchSource {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpSearchSource {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| SearchError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: None,
            password: None,
        })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let source = Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(source.with_basic_auth(config.username.clone(), config.password.clone()))
    }

    pub fn with_basic_auth(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SearchSource for HttpSearchSource {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let url = format!("{}/{}/_search", self.base_url, request.index);
        let body = build_query_body(&request);
        debug!(url = %url, size = request.size, "issuing search");

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }
        let response = builder.send().await.map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                401 | 403 => SearchError::AuthFailed(error_text),
                404 => SearchError::IndexNotFound(request.index.clone()),
                code => SearchError::Status {
                    status: code,
                    body: error_text,
                },
            });
        }

        let parsed: RawResponse = response
            .json()
            .await
            .map_err(|e| SearchError::MalformedResponse(format!("Failed to parse response: {}", e)))?;
        Ok(SearchResponse {
            hits: parsed.hits.hits,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[derive(Deserialize)]
struct RawResponse {
    hits: RawHits,
}

#[derive(Deserialize)]
struct RawHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

fn map_http_error(error: reqwest::Error) -> SearchError {
    if error.is_timeout() {
        SearchError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        SearchError::RequestFailed(format!("Connection error: {}", error))
    } else {
        SearchError::RequestFailed(format!("HTTP error: {}", error))
    }
}

/// Query DSL body for one request.
pub fn build_query_body(request: &SearchRequest) -> Value {
    let mut must = Vec::new();
    let mut filter = Vec::new();
    let mut must_not = Vec::new();

    if let Some(range) = &request.range {
        must.push(json!({ "constant_score": { "filter": range_clause(range) } }));
    }
    if let Some(ids) = &request.ids {
        filter.push(json!({ "ids": { "values": ids } }));
    }
    filter.extend(request.filters.iter().map(filter_clause));
    if !request.must_not_ids.is_empty() {
        must_not.push(json!({ "ids": { "values": request.must_not_ids } }));
    }

    let mut body = json!({
        "size": request.size,
        "version": true,
        "track_total_hits": false,
        "query": {
            "bool": {
                "must": must,
                "filter": filter,
                "must_not": must_not,
            }
        },
        "sort": request.sort.iter().map(sort_clause).collect::<Vec<_>>(),
    });

    if let Some(cursor) = &request.search_after {
        body["search_after"] = json!(cursor.values());
    }
    if !request.docvalue_fields.is_empty() {
        body["docvalue_fields"] = json!(request.docvalue_fields);
    }
    body
}

fn range_clause(range: &TimeRange) -> Value {
    let mut bounds = Map::new();
    for (key, bound) in [
        ("gte", &range.gte),
        ("gt", &range.gt),
        ("lte", &range.lte),
        ("lt", &range.lt),
    ] {
        if let Some(value) = bound {
            bounds.insert(key.to_string(), json!(value));
        }
    }
    if let Some(format) = &range.format {
        bounds.insert("format".to_string(), json!(format));
    }
    json!({ "range": { range.field.clone(): bounds } })
}

fn sort_clause(clause: &SortClause) -> Value {
    let mut spec = json!({ "order": clause.direction.as_str() });
    if clause.date_nanos {
        spec["numeric_type"] = json!("date_nanos");
    }
    json!({ clause.field.clone(): spec })
}

fn filter_clause(filter: &Filter) -> Value {
    match filter {
        Filter::Term { field, value } => json!({ "term": { field.clone(): value } }),
        Filter::Terms { field, values } => json!({ "terms": { field.clone(): values } }),
        Filter::Exists { field } => json!({ "exists": { "field": field } }),
        Filter::Not { filter } => json!({ "bool": { "must_not": [filter_clause(filter)] } }),
    }
}
