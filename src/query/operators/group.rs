//! Calendar grouping operator
//!
//! Splits a sorted series into consecutive partitions that each cover one
//! calendar day, month or year in a given timezone. Period boundaries are
//! resolved in local time, so a day may be 23 or 25 hours long around
//! daylight-saving transitions.
//!
//! Grouping is total: every input sample ends up in exactly one partition.

use chrono_tz::Tz;

use crate::time::period_bounds;
use crate::types::{Period, Series, SeriesGroup};

/// Partition `series` by calendar `period` in `tz`
///
/// `drift` seconds are added to every `x` first, which compensates for
/// samples stamped at the end (or start) of their aggregation window. With
/// `align` set, every `x` in a partition is replaced by the first instant of
/// its period (local midnight of the day, of the 1st of the month, or of
/// January 1st).
///
/// The input must be sorted by `x`; otherwise the partitioning is unspecified.
pub fn group_by_period(
    series: Series,
    drift: i64,
    align: bool,
    tz: Tz,
    period: Period,
) -> SeriesGroup {
    let mut groups: Vec<Series> = Vec::new();
    let mut current = Series::new();

    // [start, end) of the period `current` belongs to
    let mut bounds: Option<(i64, i64)> = None;

    for mut p in series {
        p.x = p.x.saturating_add(drift);

        let (start, _) = match bounds {
            Some((start, end)) if p.x >= start && p.x < end => (start, end),
            _ => {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                // Timestamps outside the calendar's range form their own partition
                let next = period_bounds(tz, p.x, period)
                    .unwrap_or((p.x, p.x.saturating_add(1)));
                bounds = Some(next);
                next
            }
        };

        if align {
            p.x = start;
        }
        current.push(p);
    }

    if !current.is_empty() {
        groups.push(current);
    }

    SeriesGroup::from(groups)
}
