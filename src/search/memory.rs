//! In-process search backend.
//!
//! Holds documents in insertion order and evaluates `SearchRequest`s by
//! linear scan: ids, exclusions, term filters, time range, two-field sort and
//! search-after. `_doc` sorts by insertion position. Every request is kept in
//! a log so callers can inspect exactly what was issued.

use super::{Filter, SearchHit, SearchRequest, SearchResponse, SearchSource, TimeRange};
use crate::error::SearchError;
use crate::sort::{SortClause, SortDirection};
use crate::time_codec::{extract_sub_millisecond_part, to_epoch_millis};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDocument {
    pub id: String,
    pub source: Map<String, Value>,
}

impl MemoryDocument {
    /// Build from a JSON object; non-object values yield an empty source.
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source: match source {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }
}

/// In-memory search source for tests and embedding
pub struct MemorySource {
    index: String,
    docs: RwLock<Vec<MemoryDocument>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MemorySource {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            docs: RwLock::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_docs(index: impl Into<String>, docs: Vec<MemoryDocument>) -> Self {
        let source = Self::new(index);
        *source.docs.write() = docs;
        source
    }

    pub fn add(&self, doc: MemoryDocument) {
        self.docs.write().push(doc);
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Every request issued so far, oldest first.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn evaluate(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        if request.index != self.index {
            return Err(SearchError::IndexNotFound(request.index.clone()));
        }
        let docs = self.docs.read();

        let mut matched: Vec<(Vec<SortValue>, usize)> = Vec::new();
        for (position, doc) in docs.iter().enumerate() {
            if let Some(ids) = &request.ids {
                if !ids.contains(&doc.id) {
                    continue;
                }
            }
            if request.must_not_ids.contains(&doc.id) {
                continue;
            }
            if !request.filters.iter().all(|f| filter_matches(f, &doc.source)) {
                continue;
            }
            if let Some(range) = &request.range {
                if !range_matches(range, &doc.source) {
                    continue;
                }
            }
            let key = request
                .sort
                .iter()
                .map(|clause| sort_value(clause, doc, position))
                .collect();
            matched.push((key, position));
        }

        matched.sort_by(|(a, _), (b, _)| compare_keys(a, b, &request.sort));

        if let Some(cursor) = &request.search_after {
            let after: Vec<SortValue> = cursor
                .values()
                .iter()
                .zip(request.sort.iter())
                .map(|(value, clause)| cursor_value(clause, value))
                .collect();
            matched.retain(|(key, _)| {
                compare_keys(key, &after, &request.sort) == Ordering::Greater
            });
        }

        Ok(matched
            .into_iter()
            .take(request.size)
            .map(|(key, position)| {
                let doc = &docs[position];
                let mut fields = Map::new();
                for docvalue in &request.docvalue_fields {
                    if let Some(value) = doc.source.get(&docvalue.field) {
                        fields.insert(docvalue.field.clone(), Value::Array(vec![value.clone()]));
                    }
                }
                SearchHit {
                    id: doc.id.clone(),
                    sort: key.into_iter().map(SortValue::into_json).collect(),
                    fields,
                    source: doc.source.clone(),
                }
            })
            .collect())
    }
}

#[async_trait]
impl SearchSource for MemorySource {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let hits = self.evaluate(&request);
        self.requests.lock().push(request);
        Ok(SearchResponse { hits: hits? })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Comparable sort value
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Missing,
    /// Epoch millis plus sub-millisecond digits
    Time(i64, u32),
    Json(Value),
}

impl SortValue {
    fn into_json(self) -> Value {
        match self {
            SortValue::Missing => Value::Null,
            SortValue::Time(millis, _) => Value::from(millis),
            SortValue::Json(value) => value,
        }
    }
}

fn time_key(value: &Value) -> Option<(i64, u32)> {
    match value {
        Value::Number(n) => n.as_i64().map(|millis| (millis, 0)),
        Value::String(s) => {
            let millis = to_epoch_millis(s).ok()?;
            let sub = extract_sub_millisecond_part(s).parse().unwrap_or(0);
            Some((millis, sub))
        }
        _ => None,
    }
}

fn sort_value(clause: &SortClause, doc: &MemoryDocument, position: usize) -> SortValue {
    if clause.field == "_doc" {
        return SortValue::Json(Value::from(position as u64));
    }
    match doc.source.get(&clause.field) {
        None | Some(Value::Null) => SortValue::Missing,
        // Integers and parseable timestamps compare as time
        Some(value) => match time_key(value) {
            Some((millis, sub)) => SortValue::Time(millis, sub),
            None => SortValue::Json(value.clone()),
        },
    }
}

fn cursor_value(clause: &SortClause, value: &Value) -> SortValue {
    if clause.field == "_doc" {
        return SortValue::Json(value.clone());
    }
    match (value, time_key(value)) {
        (Value::Null, _) => SortValue::Missing,
        (_, Some((millis, sub))) => SortValue::Time(millis, sub),
        _ => SortValue::Json(value.clone()),
    }
}

fn compare_keys(a: &[SortValue], b: &[SortValue], clauses: &[SortClause]) -> Ordering {
    for ((left, right), clause) in a.iter().zip(b.iter()).zip(clauses.iter()) {
        // Missing values sort last in either direction
        let ordering = match (left, right) {
            (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
            (SortValue::Missing, _) => Ordering::Greater,
            (_, SortValue::Missing) => Ordering::Less,
            _ => match clause.direction {
                SortDirection::Asc => compare_sort_values(left, right),
                SortDirection::Desc => compare_sort_values(right, left),
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_sort_values(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
        (SortValue::Missing, _) => Ordering::Greater,
        (_, SortValue::Missing) => Ordering::Less,
        (SortValue::Time(am, asub), SortValue::Time(bm, bsub)) => (am, asub).cmp(&(bm, bsub)),
        (SortValue::Json(a), SortValue::Json(b)) => compare_json(a, b),
        (SortValue::Time(millis, _), SortValue::Json(b)) => {
            compare_json(&Value::from(*millis), b)
        }
        (SortValue::Json(a), SortValue::Time(millis, _)) => {
            compare_json(a, &Value::from(*millis))
        }
    }
}

fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn filter_matches(filter: &Filter, source: &Map<String, Value>) -> bool {
    match filter {
        Filter::Term { field, value } => source.get(field).map_or(false, |v| v == value),
        Filter::Terms { field, values } => {
            source.get(field).map_or(false, |v| values.contains(v))
        }
        Filter::Exists { field } => source.get(field).map_or(false, |v| !v.is_null()),
        Filter::Not { filter } => !filter_matches(filter, source),
    }
}

fn range_matches(range: &TimeRange, source: &Map<String, Value>) -> bool {
    let Some(value) = source.get(&range.field).and_then(time_key) else {
        return false;
    };
    let bound = |b: &Option<String>| b.as_ref().and_then(|s| time_key(&Value::from(s.as_str())));
    if let Some(gte) = bound(&range.gte) {
        if value < gte {
            return false;
        }
    }
    if let Some(gt) = bound(&range.gt) {
        if value <= gt {
            return false;
        }
    }
    if let Some(lte) = bound(&range.lte) {
        if value > lte {
            return false;
        }
    }
    if let Some(lt) = bound(&range.lt) {
        if value >= lt {
            return false;
        }
    }
    true
}
