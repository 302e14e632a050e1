//! Property-based tests for surrounding-document retrieval

use anchorview::context::{fetch_anchor, fetch_surrounding_docs, SurroundingQuery};
use anchorview::dataset::Dataset;
use anchorview::interval::{Ladder, DAY_MILLIS};
use anchorview::search::memory::{MemoryDocument, MemorySource};
use anchorview::sort::{SortDirection, SortSpec};
use anchorview::types::{Record, SurroundingDirection};
use futures::executor::block_on;
use proptest::prelude::*;
use serde_json::json;

const BASE_MILLIS: i64 = 1_600_000_000_000;

struct Fixture {
    source: MemorySource,
    dataset: Dataset,
    /// Document ids in ascending (time, seq) order
    ordered: Vec<String>,
}

/// One document per offset; offsets may repeat.
fn fixture(offsets: &[i64]) -> Fixture {
    let docs: Vec<MemoryDocument> = offsets
        .iter()
        .enumerate()
        .map(|(seq, offset)| {
            MemoryDocument::new(
                format!("d{}", seq),
                json!({"@timestamp": BASE_MILLIS + offset, "seq": seq as u64}),
            )
        })
        .collect();

    let mut keyed: Vec<(i64, usize)> = offsets.iter().copied().zip(0..).collect();
    keyed.sort();
    Fixture {
        source: MemorySource::from_docs("logs", docs),
        dataset: Dataset::new("logs", "@timestamp").with_field("seq", true),
        ordered: keyed.into_iter().map(|(_, seq)| format!("d{}", seq)).collect(),
    }
}

fn offsets() -> impl Strategy<Value = Vec<i64>> {
    // Mostly clustered, with some records many days away
    let offset = prop_oneof![
        4 => 0i64..2_000,
        1 => 0i64..(90 * DAY_MILLIS),
    ];
    prop::collection::vec(offset, 1..60)
}

fn fetch(
    fixture: &Fixture,
    anchor: &Record,
    direction: SurroundingDirection,
    sort: SortDirection,
    size: usize,
) -> Vec<String> {
    let ladder = Ladder::default();
    let records = block_on(fetch_surrounding_docs(
        &fixture.source,
        SurroundingQuery {
            direction,
            dataset: &fixture.dataset,
            anchor: Some(anchor),
            tie_breaker: "seq",
            sort,
            size,
            filters: &[],
            ladder: &ladder,
        },
    ))
    .unwrap();
    records.into_iter().map(|r| r.id).collect()
}

fn load_anchor(fixture: &Fixture, id: &str) -> Record {
    let sort = SortSpec::new("@timestamp", "seq", SortDirection::Asc, false);
    block_on(fetch_anchor(&fixture.source, &fixture.dataset, id, &sort)).unwrap()
}

/// Neighbours are exactly the adjacent records in total order, never the anchor
#[test]
fn test_neighbours_match_total_order() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(offsets(), any::<prop::sample::Index>(), 0usize..15),
            |(offsets, pick, size)| {
                let fixture = fixture(&offsets);
                let position = pick.index(fixture.ordered.len());
                let anchor_id = fixture.ordered[position].clone();
                let anchor = load_anchor(&fixture, &anchor_id);

                let successors =
                    fetch(&fixture, &anchor, SurroundingDirection::Successors, SortDirection::Asc, size);
                let expected_after: Vec<String> = fixture.ordered[position + 1..]
                    .iter()
                    .take(size)
                    .cloned()
                    .collect();
                prop_assert_eq!(&successors, &expected_after);

                let predecessors =
                    fetch(&fixture, &anchor, SurroundingDirection::Predecessors, SortDirection::Asc, size);
                let start = position.saturating_sub(size);
                let expected_before: Vec<String> = fixture.ordered[start..position].to_vec();
                prop_assert_eq!(&predecessors, &expected_before);

                prop_assert!(!successors.contains(&anchor_id));
                prop_assert!(!predecessors.contains(&anchor_id));
                Ok(())
            },
        )
        .unwrap();
}

/// Flipping the display order mirrors the two sections
#[test]
fn test_descending_display_swaps_sections() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(offsets(), any::<prop::sample::Index>(), 1usize..10),
            |(offsets, pick, size)| {
                let fixture = fixture(&offsets);
                let anchor_id = pick.get(&fixture.ordered).clone();
                let anchor = load_anchor(&fixture, &anchor_id);

                let asc_after =
                    fetch(&fixture, &anchor, SurroundingDirection::Successors, SortDirection::Asc, size);
                let mut desc_before =
                    fetch(&fixture, &anchor, SurroundingDirection::Predecessors, SortDirection::Desc, size);
                desc_before.reverse();
                prop_assert_eq!(asc_after, desc_before);
                Ok(())
            },
        )
        .unwrap();
}

/// A zero-sized request never reaches the backend
#[test]
fn test_zero_size_issues_no_queries() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(offsets(), any::<prop::sample::Index>()), |(offsets, pick)| {
            let fixture = fixture(&offsets);
            let anchor = load_anchor(&fixture, pick.get::<String>(&fixture.ordered));
            fixture.source.clear_requests();

            for direction in [SurroundingDirection::Predecessors, SurroundingDirection::Successors] {
                let rows = fetch(&fixture, &anchor, direction, SortDirection::Desc, 0);
                prop_assert!(rows.is_empty());
            }
            prop_assert_eq!(fixture.source.request_count(), 0);
            Ok(())
        })
        .unwrap();
}

/// With fewer records than requested, every window is tried and all are returned
#[test]
fn test_sparse_data_returns_what_exists() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(0i64..(400 * DAY_MILLIS), 1..8), |offsets| {
            let fixture = fixture(&offsets);
            let anchor_id = fixture.ordered[0].clone();
            let anchor = load_anchor(&fixture, &anchor_id);
            fixture.source.clear_requests();

            let successors = fetch(
                &fixture,
                &anchor,
                SurroundingDirection::Successors,
                SortDirection::Asc,
                offsets.len() + 5,
            );
            prop_assert_eq!(successors.len(), offsets.len() - 1);
            prop_assert_eq!(fixture.source.request_count(), Ladder::default().len());
            Ok(())
        })
        .unwrap();
}
