//! Integration tests for anchor lookup plus surrounding-document retrieval

use crate::integration::test_utils::{evenly_spaced, RecordingSource};
use anchorview::context::{fetch_anchor, fetch_surrounding_docs, SurroundingQuery};
use anchorview::dataset::Dataset;
use anchorview::interval::Ladder;
use anchorview::search::memory::{MemoryDocument, MemorySource};
use anchorview::search::{Filter, SearchSource};
use anchorview::sort::{SortDirection, SortSpec};
use anchorview::types::{Record, SurroundingDirection};
use serde_json::json;

fn dataset(index: &str) -> Dataset {
    Dataset::new(index, "@timestamp").with_field("seq", true)
}

async fn anchor(source: &dyn SearchSource, dataset: &Dataset, id: &str) -> Record {
    let sort = SortSpec::new(
        dataset.time_field_name(),
        "seq",
        SortDirection::Asc,
        dataset.is_time_nanos_based(),
    );
    fetch_anchor(source, dataset, id, &sort).await.unwrap()
}

async fn neighbours(
    source: &dyn SearchSource,
    dataset: &Dataset,
    anchor: &Record,
    direction: SurroundingDirection,
    sort: SortDirection,
    size: usize,
    filters: &[Filter],
) -> Vec<Record> {
    let ladder = Ladder::default();
    fetch_surrounding_docs(
        source,
        SurroundingQuery {
            direction,
            dataset,
            anchor: Some(anchor),
            tie_breaker: "seq",
            sort,
            size,
            filters,
            ladder: &ladder,
        },
    )
    .await
    .unwrap()
}

fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

fn doc_ids(range: impl Iterator<Item = usize>) -> Vec<String> {
    range.map(|i| format!("doc-{:04}", i)).collect()
}

#[tokio::test]
async fn test_predecessors_within_first_window() {
    let source = RecordingSource::new(MemorySource::from_docs(
        "logs",
        vec![
            MemoryDocument::new("t995", json!({"@timestamp": 995, "seq": "a"})),
            MemoryDocument::new("t997", json!({"@timestamp": 997, "seq": "b"})),
            MemoryDocument::new("t999", json!({"@timestamp": 999, "seq": "c"})),
            MemoryDocument::new("anchor", json!({"@timestamp": 1000, "seq": "m"})),
        ],
    ));
    let dataset = dataset("logs");
    let anchor = anchor(&source, &dataset, "anchor").await;
    let ladder = Ladder::from_days(&[0, 1]).unwrap();

    let records = fetch_surrounding_docs(
        &source,
        SurroundingQuery {
            direction: SurroundingDirection::Predecessors,
            dataset: &dataset,
            anchor: Some(&anchor),
            tie_breaker: "seq",
            sort: SortDirection::Asc,
            size: 3,
            filters: &[],
            ladder: &ladder,
        },
    )
    .await
    .unwrap();

    assert_eq!(ids(&records), vec!["t995", "t997", "t999"]);
    // One anchor lookup, one window query
    assert_eq!(source.request_count(), 2);
}

#[tokio::test]
async fn test_exact_count_strictly_ordered_without_anchor() {
    let source = evenly_spaced("logs", 1_700_000_000_000, 100);
    let dataset = dataset("logs");
    let anchor = anchor(&source, &dataset, "doc-0050").await;

    let successors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Successors,
        SortDirection::Asc,
        10,
        &[],
    )
    .await;
    assert_eq!(ids(&successors), doc_ids(51..61));

    let predecessors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Predecessors,
        SortDirection::Asc,
        10,
        &[],
    )
    .await;
    assert_eq!(ids(&predecessors), doc_ids(40..50));
    assert!(predecessors.iter().chain(successors.iter()).all(|r| r.id != "doc-0050"));
}

#[tokio::test]
async fn test_sparse_dataset_returns_partial_result() {
    let source = evenly_spaced("logs", 0, 5);
    let dataset = dataset("logs");
    let anchor = anchor(&source, &dataset, "doc-0002").await;
    source.clear_requests();

    let predecessors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Predecessors,
        SortDirection::Asc,
        10,
        &[],
    )
    .await;
    assert_eq!(ids(&predecessors), doc_ids(0..2));
    // Every window was tried before giving up
    assert_eq!(source.request_count(), Ladder::default().len());
}

#[tokio::test]
async fn test_equal_timestamps_ordered_by_tie_breaker() {
    let mut docs: Vec<MemoryDocument> = (0..8)
        .map(|i| MemoryDocument::new(format!("tie-{}", i), json!({"@timestamp": 500, "seq": i})))
        .chain(std::iter::once(MemoryDocument::new(
            "later",
            json!({"@timestamp": 501, "seq": 0}),
        )))
        .collect();
    // Insertion order deliberately differs from tie-breaker order
    docs.reverse();
    let source = MemorySource::from_docs("logs", docs);
    let dataset = dataset("logs");
    let anchor = anchor(&source, &dataset, "tie-3").await;

    let successors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Successors,
        SortDirection::Asc,
        10,
        &[],
    )
    .await;
    assert_eq!(
        ids(&successors),
        vec!["tie-4", "tie-5", "tie-6", "tie-7", "later"]
    );

    let predecessors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Predecessors,
        SortDirection::Asc,
        2,
        &[],
    )
    .await;
    assert_eq!(ids(&predecessors), vec!["tie-1", "tie-2"]);
}

#[tokio::test]
async fn test_descending_display_order() {
    let source = evenly_spaced("logs", 0, 100);
    let dataset = dataset("logs");
    let anchor = anchor(&source, &dataset, "doc-0050").await;

    let predecessors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Predecessors,
        SortDirection::Desc,
        5,
        &[],
    )
    .await;
    assert_eq!(ids(&predecessors), doc_ids((51..56).rev()));

    let successors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Successors,
        SortDirection::Desc,
        5,
        &[],
    )
    .await;
    assert_eq!(ids(&successors), doc_ids((45..50).rev()));
}

#[tokio::test]
async fn test_descending_successors_mirror_ascending_predecessors() {
    let source = evenly_spaced("logs", 1_000, 40);
    let dataset = dataset("logs");
    let anchor = anchor(&source, &dataset, "doc-0020").await;

    let mut predecessors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Predecessors,
        SortDirection::Asc,
        7,
        &[],
    )
    .await;
    predecessors.reverse();

    let successors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Successors,
        SortDirection::Desc,
        7,
        &[],
    )
    .await;
    assert_eq!(ids(&predecessors), ids(&successors));
}

#[tokio::test]
async fn test_round_trip_from_farthest_predecessor() {
    let source = evenly_spaced("logs", 1_000, 40);
    let dataset = dataset("logs");
    let anchor = anchor(&source, &dataset, "doc-0020").await;

    let predecessors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Predecessors,
        SortDirection::Asc,
        6,
        &[],
    )
    .await;
    assert_eq!(ids(&predecessors), doc_ids(14..20));

    // The query walked backwards, so the farthest predecessor came back last
    let mut query_order = predecessors.clone();
    query_order.reverse();
    let farthest = query_order.last().unwrap().clone().into_anchor();

    let successors = neighbours(
        &source,
        &dataset,
        &farthest,
        SurroundingDirection::Successors,
        SortDirection::Asc,
        predecessors.len(),
        &[],
    )
    .await;
    let mut expected = ids(&query_order[..query_order.len() - 1]);
    expected.reverse();
    expected.push(anchor.id.clone());
    assert_eq!(ids(&successors), expected);
}

#[tokio::test]
async fn test_filters_are_applied_to_every_window() {
    let source = evenly_spaced("logs", 0, 30);
    let dataset = dataset("logs");
    let anchor = anchor(&source, &dataset, "doc-0015").await;
    source.clear_requests();

    let filters = vec![Filter::term("host", "web-0")];
    let successors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Successors,
        SortDirection::Asc,
        3,
        &filters,
    )
    .await;
    assert_eq!(ids(&successors), vec!["doc-0018", "doc-0021", "doc-0024"]);
    assert!(source.requests().iter().all(|r| r.filters == filters));
}

#[tokio::test]
async fn test_nanosecond_ties_within_one_millisecond() {
    let source = MemorySource::from_docs(
        "traces",
        vec![
            MemoryDocument::new("n700", json!({"@timestamp": "2024-01-01T00:00:00.123456700Z", "seq": 1})),
            MemoryDocument::new("anchor", json!({"@timestamp": "2024-01-01T00:00:00.123456789Z", "seq": 2})),
            MemoryDocument::new("n800", json!({"@timestamp": "2024-01-01T00:00:00.123456800Z", "seq": 3})),
            MemoryDocument::new("n900", json!({"@timestamp": "2024-01-01T00:00:00.123456900Z", "seq": 4})),
            MemoryDocument::new("next-ms", json!({"@timestamp": "2024-01-01T00:00:00.124000000Z", "seq": 5})),
        ],
    );
    let dataset = dataset("traces").with_time_nanos(true);
    let anchor = anchor(&source, &dataset, "anchor").await;
    source.clear_requests();

    let successors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Successors,
        SortDirection::Asc,
        3,
        &[],
    )
    .await;
    assert_eq!(ids(&successors), vec!["n800", "n900", "next-ms"]);

    let first = &source.requests()[0];
    let range = first.range.as_ref().unwrap();
    assert_eq!(range.gte.as_deref(), Some("2024-01-01T00:00:00.123456789Z"));
    assert_eq!(range.format.as_deref(), Some("strict_date_optional_time_nanos"));
    assert_eq!(
        first.search_after.as_ref().unwrap().values()[0],
        json!("2024-01-01T00:00:00.123456789Z")
    );

    let predecessors = neighbours(
        &source,
        &dataset,
        &anchor,
        SurroundingDirection::Predecessors,
        SortDirection::Asc,
        3,
        &[],
    )
    .await;
    assert_eq!(ids(&predecessors), vec!["n700"]);
}
