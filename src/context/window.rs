//! Windowed searcher: one bounded, cursor-paginated query over a single window.
//!
//! Stateless across calls. The caller threads the cursor from one call into
//! the next, so identical inputs always issue identical queries.

use crate::error::ContextError;
use crate::interval::{TimeWindow, RANGE_FORMAT_NANOS};
use crate::search::{Filter, SearchRequest, SearchSource};
use crate::sort::SortSpec;
use crate::types::{Cursor, Record};
use tracing::{debug, warn};

/// Inputs for a single window query
#[derive(Debug, Clone)]
pub struct WindowQuery<'a> {
    pub index: &'a str,
    pub time_field: &'a str,
    /// Sort in the direction of travel
    pub sort: &'a SortSpec,
    pub window: &'a TimeWindow,
    /// Resume strictly after this sort key
    pub cursor: Option<Cursor>,
    /// Maximum number of records to return
    pub remaining: usize,
    /// Anchor's sub-millisecond digits, set only for nanosecond time fields
    pub sub_millis: Option<&'a str>,
    /// Anchor id, never returned as its own neighbour
    pub exclude_id: &'a str,
    pub filters: &'a [Filter],
}

/// Fetch at most `query.remaining` records inside `query.window`.
pub async fn fetch_hits_in_interval(
    source: &dyn SearchSource,
    query: WindowQuery<'_>,
) -> Result<Vec<Record>, ContextError> {
    if query.remaining == 0 {
        return Ok(Vec::new());
    }
    debug_assert_eq!(query.sort.direction(), query.window.travel);

    let range = query.window.to_range(query.time_field, query.sub_millis)?;
    let time_format = query.sub_millis.map(|_| RANGE_FORMAT_NANOS);
    let request = SearchRequest::new(query.index)
        .with_range(range)
        .with_filters(query.filters)
        .excluding(query.exclude_id)
        .with_sort(query.sort)
        .with_search_after(query.cursor)
        .with_size(query.remaining)
        .with_docvalue_field(query.time_field, time_format);

    debug!(
        index = query.index,
        near = query.window.near_millis,
        far = ?query.window.far_millis,
        travel = %query.window.travel,
        size = query.remaining,
        "fetching window"
    );

    let response = source.search(request).await?;
    let returned = response.hits.len();
    let mut records = response
        .hits
        .into_iter()
        .filter(|hit| hit.id != query.exclude_id)
        .map(Record::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if records.len() > query.remaining {
        warn!(
            backend = source.name(),
            returned,
            requested = query.remaining,
            "backend exceeded requested size, truncating"
        );
        records.truncate(query.remaining);
    }
    Ok(records)
}
