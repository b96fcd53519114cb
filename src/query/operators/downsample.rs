//! Downsample Operator - M4 data reduction for visualization
//!
//! M4 (Jugel et al., "M4: A Visualization-Oriented Time Series Data
//! Aggregation", VLDB 2014) divides the x-range of a series into `width`
//! equally wide buckets, one per output pixel column, and keeps at most four
//! samples per bucket:
//!
//! - the first sample
//! - the last sample
//! - the sample with the smallest `y`
//! - the sample with the largest `y`
//!
//! Selections that land on the same sample collapse to one, so a bucket emits
//! between one and four samples. Peaks and valleys are never averaged away,
//! which makes M4 the right choice for charts where spikes matter.

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Series;

/// Reduce `series` to at most `4 * width` samples
///
/// The input is returned unchanged when it has at most `width` samples.
/// Buckets partition the inclusive x-range `[first.x, last.x]`; the input must
/// be sorted by `x`.
///
/// # Errors
///
/// Returns `InvalidArgument` if `width` is zero.
pub fn m4(series: Series, width: usize) -> Result<Series> {
    if width == 0 {
        return Err(Error::InvalidArgument(
            "downsample width must be positive".to_string(),
        ));
    }

    let n = series.len();
    if n <= width {
        return Ok(series);
    }

    let (min_x, max_x) = match (series.first(), series.last()) {
        (Some(first), Some(last)) => (first.x, last.x),
        _ => return Ok(series),
    };

    // Width of the inclusive range; i128 because max_x - min_x may overflow i64
    let span = i128::from(max_x) - i128::from(min_x) + 1;
    let buckets = width as i128;
    let bucket_of = |x: i64| ((i128::from(x) - i128::from(min_x)) * buckets / span) as usize;

    let mut result = Series::with_capacity(width.saturating_mul(4).min(n));

    // Sorted input makes each bucket a contiguous run
    let mut start = 0;
    while start < n {
        let bucket = bucket_of(series[start].x);
        let mut end = start + 1;
        while end < n && bucket_of(series[end].x) == bucket {
            end += 1;
        }

        let mut min_idx = start;
        let mut max_idx = start;
        for i in start..end {
            if series[i].y < series[min_idx].y {
                min_idx = i;
            }
            if series[i].y > series[max_idx].y {
                max_idx = i;
            }
        }

        // Emit in index order, collapsing duplicate selections
        let mut picks = [start, min_idx, max_idx, end - 1];
        picks.sort_unstable();
        let mut prev = None;
        for idx in picks {
            if prev != Some(idx) {
                result.push(series[idx]);
                prev = Some(idx);
            }
        }

        start = end;
    }

    debug!(input = n, output = result.len(), width, "M4 downsample");
    Ok(result)
}
