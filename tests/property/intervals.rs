//! Property-based tests for interval generation

use anchorview::interval::{generate_intervals, Ladder, DAY_MILLIS};
use anchorview::sort::SortDirection;
use anchorview::types::SurroundingDirection;
use proptest::prelude::*;

fn direction() -> impl Strategy<Value = SurroundingDirection> {
    prop_oneof![
        Just(SurroundingDirection::Predecessors),
        Just(SurroundingDirection::Successors),
    ]
}

fn sort() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

/// Strictly ascending day offsets starting at zero
fn ladder_days() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..400, 0..6).prop_map(|steps| {
        let mut days = vec![0u64];
        for step in steps {
            let last = *days.last().unwrap_or(&0);
            days.push(last + step);
        }
        days
    })
}

/// Same inputs always yield the same windows
#[test]
fn test_interval_generation_is_deterministic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(ladder_days(), 0i64..4_000_000_000_000, direction(), sort()),
            |(days, anchor, direction, sort)| {
                let ladder = Ladder::from_days(&days).unwrap();
                let first: Vec<_> = generate_intervals(&ladder, anchor, direction, sort).collect();
                let second: Vec<_> = generate_intervals(&ladder, anchor, direction, sort).collect();
                prop_assert_eq!(&first, &second);
                prop_assert_eq!(first.len(), days.len());
                Ok(())
            },
        )
        .unwrap();
}

/// Consecutive windows share an edge and only the last one is open
#[test]
fn test_windows_are_contiguous() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(ladder_days(), 0i64..4_000_000_000_000, direction(), sort()),
            |(days, anchor, direction, sort)| {
                let ladder = Ladder::from_days(&days).unwrap();
                let windows: Vec<_> = generate_intervals(&ladder, anchor, direction, sort).collect();

                prop_assert_eq!(windows[0].near_millis, anchor);
                prop_assert!(windows[0].contains(anchor));
                for pair in windows.windows(2) {
                    prop_assert_eq!(pair[0].far_millis, Some(pair[1].near_millis));
                }
                let last = windows.last().unwrap();
                prop_assert!(last.far_millis.is_none());
                prop_assert!(windows[..windows.len() - 1]
                    .iter()
                    .all(|w| w.far_millis.is_some()));
                Ok(())
            },
        )
        .unwrap();
}

/// Every instant on the travel side of the anchor falls in exactly one window
#[test]
fn test_windows_partition_time() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                ladder_days(),
                1_000_000_000_000i64..2_000_000_000_000,
                0i64..(500 * DAY_MILLIS),
                direction(),
                sort(),
            ),
            |(days, anchor, distance, direction, sort)| {
                let ladder = Ladder::from_days(&days).unwrap();
                let travel = direction.query_direction(sort);
                let instant = match travel {
                    SortDirection::Asc => anchor + distance,
                    SortDirection::Desc => anchor - distance,
                };
                let hits = generate_intervals(&ladder, anchor, direction, sort)
                    .filter(|w| w.contains(instant))
                    .count();
                prop_assert_eq!(hits, 1);
                Ok(())
            },
        )
        .unwrap();
}

/// Predecessors and successors walk in opposite directions
#[test]
fn test_directions_mirror_each_other() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(ladder_days(), 0i64..4_000_000_000_000, sort()), |(days, anchor, sort)| {
            let ladder = Ladder::from_days(&days).unwrap();
            let before: Vec<_> =
                generate_intervals(&ladder, anchor, SurroundingDirection::Predecessors, sort)
                    .collect();
            let after: Vec<_> =
                generate_intervals(&ladder, anchor, SurroundingDirection::Successors, sort)
                    .collect();
            for (b, a) in before.iter().zip(after.iter()) {
                prop_assert_eq!(b.travel, a.travel.reverse());
                prop_assert_eq!(b.near_millis - anchor, anchor - a.near_millis);
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_reverse_is_an_involution() {
    for direction in [SortDirection::Asc, SortDirection::Desc] {
        assert_eq!(direction.reverse().reverse(), direction);
        assert_ne!(direction.reverse(), direction);
    }
}
