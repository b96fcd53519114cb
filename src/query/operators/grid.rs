//! Grid operator - rasterize timestamps
//!
//! Snapping maps every `x` onto a fixed grid so that samples from different
//! series line up for [`group_reduce_transposed`]. With the default grid of
//! 600 seconds:
//!
//! ```text
//!  300 =>    0
//!  601 =>  600
//! 1202 => 1200
//! 1700 => 1200
//! ```
//!
//! [`group_reduce_transposed`]: super::aggregation::group_reduce_transposed

use crate::error::{Error, Result};
use crate::types::Series;

/// Replace each `x` with `x / divisor * divisor`
///
/// Integer division truncates toward zero, which equals flooring for
/// non-negative timestamps. Snapping is idempotent.
///
/// # Errors
///
/// Returns `InvalidArgument` if `divisor` is not positive.
pub fn snap_to_grid(mut series: Series, divisor: i64) -> Result<Series> {
    if divisor <= 0 {
        return Err(Error::InvalidArgument(format!(
            "grid divisor must be positive, got {}",
            divisor
        )));
    }

    for p in series.iter_mut() {
        p.x = p.x / divisor * divisor;
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point, DEFAULT_GRID};

    fn xs(series: &Series) -> Vec<i64> {
        series.iter().map(|p| p.x).collect()
    }

    #[test]
    fn test_snap_default_grid() {
        let input: Series = [300, 601, 1202, 1700]
            .into_iter()
            .map(|x| Point::new(x, 1))
            .collect();

        let snapped = snap_to_grid(input, DEFAULT_GRID).unwrap();
        assert_eq!(xs(&snapped), vec![0, 600, 1200, 1200]);
        assert!(snapped.iter().all(|p| p.y == 1));
    }

    #[test]
    fn test_snap_idempotent() {
        let input: Series = (0..50).map(|i| Point::new(i * 137, i)).collect();
        let once = snap_to_grid(input, 600).unwrap();
        let twice = snap_to_grid(once.clone(), 600).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_snap_rejects_non_positive_divisor() {
        let input = Series::from(vec![Point::new(1, 1)]);
        assert!(matches!(
            snap_to_grid(input.clone(), 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            snap_to_grid(input, -600),
            Err(Error::InvalidArgument(_))
        ));
    }
}
