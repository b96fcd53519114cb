//! Aggregation Operator - Scalar and grouped reductions
//!
//! Provides the integer-domain reductions of the pipeline:
//! - [`reduce`]: one value for one series
//! - [`group_reduce`]: one sample per inner series
//! - [`group_reduce_transposed`]: one sample per distinct `x` across a group
//!
//! Absence of a result (empty input) is reported as `None`, never as an error.
//! `Avg` is `sum / count` truncated toward zero; the sum is accumulated in
//! 128 bits so it cannot overflow before the division. `Sum` saturates at the
//! `i64` bounds.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::types::{AggregateKind, Point, Series, SeriesGroup};

// ============================================================================
// Aggregate State
// ============================================================================

/// Incremental state for the integer reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateState {
    /// Sum of values
    sum: i128,

    /// Number of values
    count: u64,

    /// Smallest value
    min: i64,

    /// Largest value
    max: i64,
}

impl AggregateState {
    /// Create new empty state
    pub fn new() -> Self {
        Self {
            sum: 0,
            count: 0,
            min: i64::MAX,
            max: i64::MIN,
        }
    }

    /// Add a value
    #[inline]
    pub fn add(&mut self, value: i64) {
        self.sum += i128::from(value);
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Number of values added so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Final value for `kind`, or `None` if no value was added
    pub fn finalize(&self, kind: AggregateKind) -> Option<i64> {
        if self.count == 0 {
            return None;
        }

        let value = match kind {
            AggregateKind::Min => self.min,
            AggregateKind::Max => self.max,
            AggregateKind::Sum => clamp_i128(self.sum),
            AggregateKind::Count => i64::try_from(self.count).unwrap_or(i64::MAX),
            // i128 division truncates toward zero
            AggregateKind::Avg => clamp_i128(self.sum / i128::from(self.count)),
        };
        Some(value)
    }
}

impl Default for AggregateState {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_i128(value: i128) -> i64 {
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

// ============================================================================
// Reductions
// ============================================================================

/// Reduce the `y` values of a series
///
/// Returns `None` for an empty series.
pub fn reduce(points: &[Point], kind: AggregateKind) -> Option<i64> {
    let mut state = AggregateState::new();
    for p in points {
        state.add(p.y);
    }
    state.finalize(kind)
}

/// Reduce every inner series to one sample
///
/// The sample's `x` is the first `x` of the inner series, for every kind.
/// For `Min` and `Max` that is not the `x` where the extreme occurred; callers
/// rely on this, so it is kept as is. Empty inner series produce no sample.
pub fn group_reduce(group: &SeriesGroup, kind: AggregateKind) -> Series {
    group
        .iter()
        .filter_map(|series| {
            let first = series.first()?;
            reduce(series, kind).map(|y| Point::new(first.x, y))
        })
        .collect()
}

/// Reduce across series, joining on equal `x`
///
/// Every distinct `x` found in any inner series forms one bucket holding the
/// `y` values at that `x`; the output holds one reduced sample per bucket in
/// ascending `x`. Each inner series must be sorted by `x`; the series are
/// merged with a k-way heap merge rather than re-sorted.
pub fn group_reduce_transposed(group: &SeriesGroup, kind: AggregateKind) -> Series {
    // (x, series index, position in series)
    let mut heap: BinaryHeap<Reverse<(i64, usize, usize)>> = group
        .iter()
        .enumerate()
        .filter_map(|(idx, series)| series.first().map(|p| Reverse((p.x, idx, 0))))
        .collect();

    let mut result = Series::new();
    let mut current: Option<(i64, AggregateState)> = None;

    while let Some(Reverse((x, idx, pos))) = heap.pop() {
        let y = group[idx][pos].y;

        match current.as_mut() {
            Some((cx, state)) if *cx == x => state.add(y),
            _ => {
                if let Some((cx, state)) = current.take() {
                    if let Some(value) = state.finalize(kind) {
                        result.push(Point::new(cx, value));
                    }
                }
                let mut state = AggregateState::new();
                state.add(y);
                current = Some((x, state));
            }
        }

        if let Some(next) = group[idx].get(pos + 1) {
            heap.push(Reverse((next.x, idx, pos + 1)));
        }
    }

    if let Some((cx, state)) = current {
        if let Some(value) = state.finalize(kind) {
            result.push(Point::new(cx, value));
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
