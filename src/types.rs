//! Core value types: records, sort keys, cursors.

use crate::error::ContextError;
use crate::search::SearchHit;
use crate::sort::SortDirection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Which neighbours of the anchor a fetch targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurroundingDirection {
    /// Rows displayed before the anchor
    Predecessors,
    /// Rows displayed after the anchor
    Successors,
}

impl SurroundingDirection {
    /// Sort direction of the underlying query for a given display direction.
    pub fn query_direction(self, sort: SortDirection) -> SortDirection {
        match self {
            SurroundingDirection::Successors => sort,
            SurroundingDirection::Predecessors => sort.reverse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SurroundingDirection::Predecessors => "predecessors",
            SurroundingDirection::Successors => "successors",
        }
    }
}

impl fmt::Display for SurroundingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw sort values of a record: primary time value, then tie-breaker value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub time: Value,
    pub tie_breaker: Value,
}

impl SortKey {
    pub fn new(time: impl Into<Value>, tie_breaker: impl Into<Value>) -> Self {
        Self {
            time: time.into(),
            tie_breaker: tie_breaker.into(),
        }
    }

    /// Build from a backend sort array, which must hold exactly two values.
    pub fn from_values(values: Vec<Value>) -> Option<Self> {
        let [time, tie_breaker]: [Value; 2] = values.try_into().ok()?;
        Some(Self { time, tie_breaker })
    }

    pub fn to_values(&self) -> Vec<Value> {
        vec![self.time.clone(), self.tie_breaker.clone()]
    }
}

/// A document returned by the search backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub sort_key: SortKey,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub source: Map<String, Value>,
    #[serde(default)]
    pub is_anchor: bool,
}

impl Record {
    /// Value of `name`, preferring requested doc-value fields over `_source`.
    /// Doc-value fields arrive as arrays; the first element is returned.
    pub fn field_value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(Value::Array(values)) => values.first(),
            Some(value) => Some(value),
            None => self.source.get(name),
        }
    }

    /// Time value of `field` as a string, if the backend returned one.
    pub fn time_string(&self, field: &str) -> Option<&str> {
        self.field_value(field).and_then(Value::as_str)
    }

    pub fn into_anchor(mut self) -> Self {
        self.is_anchor = true;
        self
    }
}

impl TryFrom<SearchHit> for Record {
    type Error = ContextError;

    fn try_from(hit: SearchHit) -> Result<Self, Self::Error> {
        let count = hit.sort.len();
        let sort_key = SortKey::from_values(hit.sort).ok_or_else(|| ContextError::MalformedHit {
            id: hit.id.clone(),
            reason: format!("expected 2 sort values, got {}", count),
        })?;
        Ok(Record {
            id: hit.id,
            sort_key,
            fields: hit.fields,
            source: hit.source,
            is_anchor: false,
        })
    }
}

/// Search-after continuation: the sort values of the last record seen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor(Vec<Value>);

impl Cursor {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Cursor resuming after `record`. On nanosecond time fields the time
    /// component is the full-precision string, since the millisecond sort
    /// value would collapse distinct nanosecond timestamps.
    pub fn after(record: &Record, time_field: &str, time_nanos: bool) -> Self {
        let time = match (time_nanos, record.time_string(time_field)) {
            (true, Some(full)) => Value::String(full.to_string()),
            _ => record.sort_key.time.clone(),
        };
        Self(vec![time, record.sort_key.tie_breaker.clone()])
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}
