//! Query Operators - Series transformation and reduction primitives
//!
//! This module provides the building blocks of a chart query:
//! - [`scale`] and [`limit`] for point-wise rescaling and value filtering
//! - [`grid`] for snapping timestamps onto a fixed raster
//! - [`group`] for calendar partitioning (day, month, year)
//! - [`downsample`] for M4 data reduction
//! - [`aggregation`] for scalar, grouped and transposed reductions
//!
//! All operators are plain functions over owned values: they take the series
//! they transform by value and hand back the result, without shared state.
//! [`Intrinsics`] bundles them behind a trait so an optimized backend can
//! replace the reference implementation without touching call sites.

pub mod aggregation;
pub mod downsample;
pub mod grid;
pub mod group;
pub mod limit;
pub mod scale;

// Re-export commonly used items
pub use aggregation::{group_reduce, group_reduce_transposed, reduce, AggregateState};
pub use downsample::m4;
pub use grid::snap_to_grid;
pub use group::group_by_period;
pub use limit::limit;
pub use scale::scale;

use chrono_tz::Tz;

use crate::error::Result;
use crate::types::{AggregateKind, Period, Point, Series, SeriesGroup};

// ============================================================================
// Intrinsics
// ============================================================================

/// Backend for the math primitives of the pipeline
///
/// Every method has a default that calls the reference operator of this
/// module, so an implementation only overrides what it accelerates.
/// Overrides must produce exactly the same results, including the `Avg`
/// truncation toward zero and the first-`x` rule of `group_reduce`.
///
/// Implementations are shared between concurrent queries and must not keep
/// per-call state.
pub trait Intrinsics: Send + Sync {
    /// See [`scale::scale`]
    fn scale(&self, series: Series, x_factor: i64, y_factor: i64) -> Series {
        scale::scale(series, x_factor, y_factor)
    }

    /// See [`limit::limit`]
    fn limit(&self, series: Series, min: i64, max: i64) -> Series {
        limit::limit(series, min, max)
    }

    /// See [`grid::snap_to_grid`]
    fn snap_to_grid(&self, series: Series, divisor: i64) -> Result<Series> {
        grid::snap_to_grid(series, divisor)
    }

    /// See [`group::group_by_period`]
    fn group_by_period(
        &self,
        series: Series,
        drift: i64,
        align: bool,
        tz: Tz,
        period: Period,
    ) -> SeriesGroup {
        group::group_by_period(series, drift, align, tz, period)
    }

    /// See [`downsample::m4`]
    fn m4(&self, series: Series, width: usize) -> Result<Series> {
        downsample::m4(series, width)
    }

    /// See [`aggregation::reduce`]
    fn reduce(&self, points: &[Point], kind: AggregateKind) -> Option<i64> {
        aggregation::reduce(points, kind)
    }

    /// See [`aggregation::group_reduce`]
    fn group_reduce(&self, group: &SeriesGroup, kind: AggregateKind) -> Series {
        aggregation::group_reduce(group, kind)
    }

    /// See [`aggregation::group_reduce_transposed`]
    fn group_reduce_transposed(&self, group: &SeriesGroup, kind: AggregateKind) -> Series {
        aggregation::group_reduce_transposed(group, kind)
    }

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// The reference backend: plain single-threaded loops
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceIntrinsics;

impl Intrinsics for ReferenceIntrinsics {
    fn name(&self) -> &'static str {
        "reference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that counts reductions, to check dispatch through the trait
    struct CountingIntrinsics {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Intrinsics for CountingIntrinsics {
        fn reduce(&self, points: &[Point], kind: AggregateKind) -> Option<i64> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            aggregation::reduce(points, kind)
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn test_reference_defaults() {
        let math = ReferenceIntrinsics;
        let series = Series::from(vec![Point::new(301, 2), Point::new(601, 40)]);

        let snapped = math.snap_to_grid(series.clone(), 300).unwrap();
        assert_eq!(snapped[0].x, 300);
        assert_eq!(math.reduce(&series, AggregateKind::Sum), Some(42));
        assert_eq!(math.limit(series, 0, 10).len(), 1);
        assert_eq!(math.name(), "reference");
    }

    #[test]
    fn test_override_is_used() {
        let math = CountingIntrinsics {
            calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let backend: &dyn Intrinsics = &math;
        assert_eq!(
            backend.reduce(&[Point::new(0, 3)], AggregateKind::Max),
            Some(3)
        );
        assert_eq!(math.calls.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
