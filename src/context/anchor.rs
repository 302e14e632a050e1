//! Anchor locator: point lookup of the anchor record by id.

use crate::dataset::Dataset;
use crate::error::ContextError;
use crate::interval::RANGE_FORMAT_NANOS;
use crate::search::{SearchRequest, SearchSource};
use crate::sort::SortSpec;
use crate::types::Record;
use tracing::{debug, warn};

/// Resolve `anchor_id` to exactly one record, sorted with `sort` so its sort
/// key is comparable to its neighbours' keys.
pub async fn fetch_anchor(
    source: &dyn SearchSource,
    dataset: &Dataset,
    anchor_id: &str,
    sort: &SortSpec,
) -> Result<Record, ContextError> {
    let time_format = dataset.is_time_nanos_based().then_some(RANGE_FORMAT_NANOS);
    // Two hits are enough to tell a unique id from an ambiguous one
    let request = SearchRequest::new(dataset.index.as_str())
        .with_ids(vec![anchor_id.to_string()])
        .with_sort(sort)
        .with_size(2)
        .with_docvalue_field(dataset.time_field_name(), time_format);

    debug!(index = %dataset.index, anchor_id, "fetching anchor");
    let response = source.search(request).await?;
    let mut hits = response.hits;
    match hits.len() {
        0 => {
            warn!(anchor_id, "anchor not found");
            Err(ContextError::AnchorNotFound(anchor_id.to_string()))
        }
        1 => {
            let hit = hits.remove(0);
            Ok(Record::try_from(hit)?.into_anchor())
        }
        count => {
            warn!(anchor_id, count, "anchor id is not unique");
            Err(ContextError::AnchorNotUnique {
                id: anchor_id.to_string(),
                count,
            })
        }
    }
}
