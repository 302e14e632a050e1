//! Interval sequence generation.
//!
//! Neighbours are searched in windows that expand outward from the anchor
//! along a fixed ladder of offsets. Each window touches the previous one, so
//! the sequence covers all time in the direction of travel exactly once.

use crate::error::ContextError;
use crate::search::TimeRange;
use crate::sort::SortDirection;
use crate::time_codec::to_iso_boundary;
use crate::types::SurroundingDirection;
use serde::{Deserialize, Serialize};

pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Default ladder, in days.
pub const LOOKUP_OFFSETS_DAYS: [u64; 6] = [0, 1, 7, 30, 365, 10_000];

/// Range format understood by the backend for ISO bounds.
pub const RANGE_FORMAT: &str = "strict_date_optional_time";
pub const RANGE_FORMAT_NANOS: &str = "strict_date_optional_time_nanos";

/// Ascending offsets from the anchor, starting at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ladder {
    offsets_millis: Vec<i64>,
}

impl Ladder {
    pub fn from_days(days: &[u64]) -> Result<Self, ContextError> {
        let millis = days
            .iter()
            .map(|d| {
                i64::try_from(*d)
                    .ok()
                    .and_then(|d| d.checked_mul(DAY_MILLIS))
                    .ok_or_else(|| {
                        ContextError::ConfigError(format!("Ladder offset too large: {} days", d))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_millis(millis)
    }

    pub fn from_millis(offsets_millis: Vec<i64>) -> Result<Self, ContextError> {
        match offsets_millis.first() {
            None => {
                return Err(ContextError::ConfigError(
                    "Ladder must have at least one offset".to_string(),
                ))
            }
            Some(first) if *first != 0 => {
                return Err(ContextError::ConfigError(format!(
                    "Ladder must start at offset 0, got {}",
                    first
                )))
            }
            Some(_) => {}
        }
        if offsets_millis.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ContextError::ConfigError(format!(
                "Ladder offsets must be strictly ascending: {:?}",
                offsets_millis
            )));
        }
        Ok(Self { offsets_millis })
    }

    pub fn offsets_millis(&self) -> &[i64] {
        &self.offsets_millis
    }

    /// Number of windows the ladder yields.
    pub fn len(&self) -> usize {
        self.offsets_millis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets_millis.is_empty()
    }

    /// Relative intervals, one per step; the last one is open-ended.
    pub fn intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        self.offsets_millis
            .iter()
            .enumerate()
            .map(move |(idx, start)| Interval {
                start_offset_millis: *start,
                end_offset_millis: self.offsets_millis.get(idx + 1).copied(),
            })
    }
}

impl Default for Ladder {
    fn default() -> Self {
        Self {
            offsets_millis: LOOKUP_OFFSETS_DAYS
                .iter()
                .map(|d| *d as i64 * DAY_MILLIS)
                .collect(),
        }
    }
}

/// Window relative to the anchor, measured along the direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start_offset_millis: i64,
    /// `None` leaves the window open
    pub end_offset_millis: Option<i64>,
}

impl Interval {
    /// Absolute window for an anchor time. `travel` is the query's sort
    /// direction: ascending walks forward in time, descending walks back.
    pub fn materialize(&self, anchor_millis: i64, travel: SortDirection) -> TimeWindow {
        let shift = |offset: i64| match travel {
            SortDirection::Asc => anchor_millis.saturating_add(offset),
            SortDirection::Desc => anchor_millis.saturating_sub(offset),
        };
        TimeWindow {
            near_millis: shift(self.start_offset_millis),
            far_millis: self.end_offset_millis.map(shift),
            travel,
        }
    }
}

/// Absolute window: closed at the edge nearest the anchor, open at the far edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub near_millis: i64,
    pub far_millis: Option<i64>,
    pub travel: SortDirection,
}

impl TimeWindow {
    pub fn contains(&self, millis: i64) -> bool {
        match self.travel {
            SortDirection::Asc => {
                millis >= self.near_millis && self.far_millis.map_or(true, |far| millis < far)
            }
            SortDirection::Desc => {
                millis <= self.near_millis && self.far_millis.map_or(true, |far| millis > far)
            }
        }
    }

    /// Range filter on `field`. With `sub_millis`, bounds carry the anchor's
    /// nanosecond remainder so the near edge lands exactly on the anchor.
    pub fn to_range(&self, field: &str, sub_millis: Option<&str>) -> Result<TimeRange, ContextError> {
        let near = to_iso_boundary(self.near_millis, sub_millis)?;
        let far = self
            .far_millis
            .map(|far| to_iso_boundary(far, sub_millis))
            .transpose()?;
        let format = if sub_millis.is_some() {
            RANGE_FORMAT_NANOS
        } else {
            RANGE_FORMAT
        };
        let mut range = TimeRange::new(field).with_format(format);
        match self.travel {
            SortDirection::Asc => {
                range.gte = Some(near);
                range.lt = far;
            }
            SortDirection::Desc => {
                range.lte = Some(near);
                range.gt = far;
            }
        }
        Ok(range)
    }
}

/// Lazy, finite sequence of windows walking away from the anchor.
pub struct IntervalSequence<'a> {
    ladder: &'a Ladder,
    anchor_millis: i64,
    travel: SortDirection,
    next: usize,
}

impl Iterator for IntervalSequence<'_> {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<Self::Item> {
        let offsets = self.ladder.offsets_millis();
        let start = *offsets.get(self.next)?;
        let interval = Interval {
            start_offset_millis: start,
            end_offset_millis: offsets.get(self.next + 1).copied(),
        };
        self.next += 1;
        Some(interval.materialize(self.anchor_millis, self.travel))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ladder.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IntervalSequence<'_> {}

/// Windows for one direction of a context fetch.
///
/// Successors travel in the display sort direction; predecessors travel in
/// the reverse direction.
pub fn generate_intervals(
    ladder: &Ladder,
    anchor_millis: i64,
    direction: SurroundingDirection,
    sort: SortDirection,
) -> IntervalSequence<'_> {
    IntervalSequence {
        ladder,
        anchor_millis,
        travel: direction.query_direction(sort),
        next: 0,
    }
}
