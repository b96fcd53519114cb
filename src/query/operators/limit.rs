//! Limit operator for value-range filtering
//!
//! Keeps only the samples whose `y` lies within an inclusive range.
//!
//! # Example
//!
//! ```rust
//! use kuba_dsl::query::operators::limit::limit;
//! use kuba_dsl::types::{Point, Series};
//!
//! let series = Series::from(vec![Point::new(0, -5), Point::new(1, 3), Point::new(2, 12)]);
//! assert_eq!(limit(series, 0, 10), Series::from(vec![Point::new(1, 3)]));
//! ```

use crate::types::Series;

/// Keep samples with `min <= y <= max`, preserving order
///
/// Filters in place: the returned series reuses the input buffer. An empty
/// range (`min > max`) yields an empty series.
pub fn limit(mut series: Series, min: i64, max: i64) -> Series {
    series.retain(|p| p.y >= min && p.y <= max);
    series
}
