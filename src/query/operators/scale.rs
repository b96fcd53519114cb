//! Scale operator
//!
//! Multiplies `x` and `y` of every sample by integer factors, e.g. to turn
//! minutes into seconds or to change the fixed-point precision of a metric.

use crate::types::Series;

/// Multiply every sample's `x` by `x_factor` and `y` by `y_factor`
///
/// Runs in place. Products saturate at the `i64` bounds instead of wrapping.
pub fn scale(mut series: Series, x_factor: i64, y_factor: i64) -> Series {
    for p in series.iter_mut() {
        p.x = p.x.saturating_mul(x_factor);
        p.y = p.y.saturating_mul(y_factor);
    }
    series
}
