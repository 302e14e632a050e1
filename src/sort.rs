//! Sort direction and the two-field sort used by every context query.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort direction for a query or for the displayed context rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// The opposite direction. `d.reverse().reverse() == d`.
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!(
                "Invalid sort direction: '{}'. Must be 'asc' or 'desc'.",
                other
            )),
        }
    }
}

/// One sort clause on a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub direction: SortDirection,
    /// Ask the backend to compare this field at nanosecond resolution
    #[serde(default)]
    pub date_nanos: bool,
}

/// Sort on `(time_field, tie_breaker_field)`, both in the same direction.
///
/// Anchor lookups and neighbour queries share this shape so that the anchor's
/// sort key is directly comparable with its neighbours' keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub time: SortClause,
    pub tie_breaker: SortClause,
}

impl SortSpec {
    pub fn new(
        time_field: impl Into<String>,
        tie_breaker_field: impl Into<String>,
        direction: SortDirection,
        time_nanos: bool,
    ) -> Self {
        Self {
            time: SortClause {
                field: time_field.into(),
                direction,
                date_nanos: time_nanos,
            },
            tie_breaker: SortClause {
                field: tie_breaker_field.into(),
                direction,
                date_nanos: false,
            },
        }
    }

    pub fn direction(&self) -> SortDirection {
        self.time.direction
    }

    /// Same fields, other direction.
    pub fn reversed(&self) -> Self {
        let mut spec = self.clone();
        spec.time.direction = spec.time.direction.reverse();
        spec.tie_breaker.direction = spec.tie_breaker.direction.reverse();
        spec
    }

    pub fn clauses(&self) -> [&SortClause; 2] {
        [&self.time, &self.tie_breaker]
    }
}
