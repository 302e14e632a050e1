//! Search Source Abstraction
//!
//! The query contract every context fetch runs against: a bounded range
//! query with a two-field sort, a size cap, and search-after pagination.
//! `SearchRequest` is assembled field by field the way callers configure a
//! search source; backends translate it for a concrete engine.

use crate::error::SearchError;
use crate::sort::{SortClause, SortSpec};
use crate::types::Cursor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod http;
pub mod memory;

pub use http::HttpSearchSource;
pub use memory::MemorySource;

/// Search backend client trait
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Execute one query
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError>;

    /// Backend name, for logs
    fn name(&self) -> &str;
}

/// Range on a time field. Bounds are ISO strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl TimeRange {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Externally built predicate ANDed into every context query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Field equals value
    Term { field: String, value: Value },
    /// Field equals any of the values
    Terms { field: String, values: Vec<Value> },
    /// Field is present
    Exists { field: String },
    /// Negation of the inner filter
    Not { filter: Box<Filter> },
}

impl Filter {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn negate(self) -> Self {
        Filter::Not {
            filter: Box::new(self),
        }
    }

    /// Parse `field=value` (or `!field=value` for negation) as a term filter.
    pub fn parse_term(spec: &str) -> Result<Self, String> {
        let (negated, spec) = match spec.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        let (field, raw) = spec
            .split_once('=')
            .ok_or_else(|| format!("Invalid filter '{}': expected field=value", spec))?;
        if field.trim().is_empty() {
            return Err(format!("Invalid filter '{}': empty field name", spec));
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        let filter = Filter::term(field.trim(), value);
        Ok(if negated { filter.negate() } else { filter })
    }
}

/// Doc-value field to return with each hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocValueField {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// One query against the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub index: String,
    /// Restrict to these document ids
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub range: Option<TimeRange>,
    /// Never return these document ids
    #[serde(default)]
    pub must_not_ids: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Vec<SortClause>,
    #[serde(default)]
    pub search_after: Option<Cursor>,
    pub size: usize,
    #[serde(default)]
    pub docvalue_fields: Vec<DocValueField>,
}

impl SearchRequest {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ids: None,
            range: None,
            must_not_ids: Vec::new(),
            filters: Vec::new(),
            sort: Vec::new(),
            search_after: None,
            size: 10,
            docvalue_fields: Vec::new(),
        }
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn excluding(mut self, id: impl Into<String>) -> Self {
        self.must_not_ids.push(id.into());
        self
    }

    pub fn with_filters(mut self, filters: &[Filter]) -> Self {
        self.filters.extend_from_slice(filters);
        self
    }

    pub fn with_sort(mut self, sort: &SortSpec) -> Self {
        self.sort = sort.clauses().into_iter().cloned().collect();
        self
    }

    pub fn with_search_after(mut self, cursor: Option<Cursor>) -> Self {
        self.search_after = cursor;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_docvalue_field(mut self, field: impl Into<String>, format: Option<&str>) -> Self {
        self.docvalue_fields.push(DocValueField {
            field: field.into(),
            format: format.map(str::to_string),
        });
        self
    }
}

/// Raw hit as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub sort: Vec<Value>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
}

/// Backend response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
}
