//! Dataset descriptor: index, time field, and which fields can sort.

use crate::error::ContextError;
use serde::{Deserialize, Serialize};

/// Meta fields every backend index can sort on.
pub const META_FIELDS: &[&str] = &["_doc", "_seq_no", "_uid"];

/// A field declared on the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub sortable: bool,
}

/// Describes the collection a context session reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Index (or index pattern) name passed to the search backend
    pub index: String,
    pub time_field: String,
    /// Time field stores nanosecond precision
    #[serde(default)]
    pub time_nanos: bool,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl Dataset {
    pub fn new(index: impl Into<String>, time_field: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            time_field: time_field.into(),
            time_nanos: false,
            fields: Vec::new(),
        }
    }

    pub fn with_time_nanos(mut self, time_nanos: bool) -> Self {
        self.time_nanos = time_nanos;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, sortable: bool) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            sortable,
        });
        self
    }

    pub fn time_field_name(&self) -> &str {
        &self.time_field
    }

    pub fn is_time_nanos_based(&self) -> bool {
        self.time_nanos
    }

    pub fn is_sortable(&self, name: &str) -> bool {
        META_FIELDS.contains(&name)
            || self
                .fields
                .iter()
                .any(|field| field.name == name && field.sortable)
    }

    /// Declared fields eligible as tie-breakers.
    pub fn sortable_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.sortable)
            .map(|field| field.name.as_str())
    }

    /// First candidate the dataset can sort on.
    pub fn first_sortable_field<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .map(String::as_str)
            .find(|name| self.is_sortable(name))
    }

    pub fn resolve_tie_breaker(&self, candidates: &[String]) -> Result<String, ContextError> {
        self.first_sortable_field(candidates)
            .map(str::to_string)
            .ok_or_else(|| ContextError::InvalidTieBreaker {
                candidates: candidates.to_vec(),
            })
    }
}
