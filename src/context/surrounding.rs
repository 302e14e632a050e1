//! Surrounding-document fetcher.
//!
//! Walks the interval ladder away from the anchor, one window at a time,
//! until the requested number of neighbours is collected or the ladder runs
//! out. Windows are visited strictly in order because each query resumes
//! from the last record the previous one returned.

use crate::context::window::{fetch_hits_in_interval, WindowQuery};
use crate::dataset::Dataset;
use crate::error::ContextError;
use crate::interval::{generate_intervals, Ladder};
use crate::search::{Filter, SearchSource};
use crate::sort::{SortDirection, SortSpec};
use crate::time_codec::{extract_sub_millisecond_part, to_epoch_millis};
use crate::types::{Cursor, Record, SurroundingDirection};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

/// Inputs for one direction of a context fetch
#[derive(Debug, Clone)]
pub struct SurroundingQuery<'a> {
    pub direction: SurroundingDirection,
    pub dataset: &'a Dataset,
    pub anchor: Option<&'a Record>,
    pub tie_breaker: &'a str,
    /// Display sort direction of the context rows
    pub sort: SortDirection,
    pub size: usize,
    pub filters: &'a [Filter],
    pub ladder: &'a Ladder,
}

/// Fetch up to `query.size` neighbours of the anchor, in display order.
///
/// Returns fewer records when the collection runs out; that is not an error.
pub async fn fetch_surrounding_docs(
    source: &dyn SearchSource,
    query: SurroundingQuery<'_>,
) -> Result<Vec<Record>, ContextError> {
    let anchor = match query.anchor {
        Some(anchor) if query.size > 0 => anchor,
        _ => return Ok(Vec::new()),
    };
    let dataset = query.dataset;
    let time_field = dataset.time_field_name();
    let time_nanos = dataset.is_time_nanos_based();

    let travel = query.direction.query_direction(query.sort);
    let sort = SortSpec::new(time_field, query.tie_breaker, travel, time_nanos);
    let anchor_millis = anchor_time_millis(anchor, dataset)?;
    let sub_millis = if time_nanos {
        anchor
            .time_string(time_field)
            .map(extract_sub_millisecond_part)
            .filter(|digits| !digits.is_empty())
    } else {
        None
    };

    let mut documents: VecDeque<Record> = VecDeque::with_capacity(query.size);
    for window in generate_intervals(query.ladder, anchor_millis, query.direction, query.sort) {
        let remaining = query.size.saturating_sub(documents.len());
        if remaining == 0 {
            break;
        }

        // Resume after the record furthest from the anchor so far
        let last = match query.direction {
            SurroundingDirection::Successors => documents.back(),
            SurroundingDirection::Predecessors => documents.front(),
        };
        let cursor = Cursor::after(last.unwrap_or(anchor), time_field, time_nanos);

        let hits = fetch_hits_in_interval(
            source,
            WindowQuery {
                index: &dataset.index,
                time_field,
                sort: &sort,
                window: &window,
                cursor: Some(cursor),
                remaining,
                sub_millis: sub_millis.as_deref(),
                exclude_id: &anchor.id,
                filters: query.filters,
            },
        )
        .await?;

        debug!(
            direction = %query.direction,
            near = window.near_millis,
            hits = hits.len(),
            remaining,
            "window fetched"
        );

        match query.direction {
            SurroundingDirection::Successors => documents.extend(hits),
            SurroundingDirection::Predecessors => {
                for hit in hits {
                    documents.push_front(hit);
                }
            }
        }
    }

    Ok(documents.into())
}

/// Millisecond coordinate of the anchor used for window arithmetic.
pub fn anchor_time_millis(anchor: &Record, dataset: &Dataset) -> Result<i64, ContextError> {
    let time_field = dataset.time_field_name();
    let missing = || ContextError::MissingTimeValue {
        id: anchor.id.clone(),
        field: time_field.to_string(),
    };
    if dataset.is_time_nanos_based() {
        let full = anchor.time_string(time_field).ok_or_else(missing)?;
        return to_epoch_millis(full);
    }
    match &anchor.sort_key.time {
        Value::Number(n) => n.as_i64().ok_or_else(missing),
        Value::String(s) => to_epoch_millis(s),
        _ => Err(missing()),
    }
}
