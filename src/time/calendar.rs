//! Timezone-aware calendar boundaries
//!
//! All boundaries are computed in the zone's local calendar: the start of the
//! next period minus one second, never a fixed number of seconds added to a
//! start. This keeps days of 23 or 25 hours and leap years correct.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;

use super::zone::local_to_instant_lenient;
use crate::error::{Error, Result};
use crate::types::{Interval, Period};

/// Calendar helper bound to a timezone and a reference instant
///
/// Every method is a pure function of `(now, zone)`. [`Calendar::new`] reads
/// the system clock once; [`Calendar::at`] pins "now" for reproducible
/// results.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::Tz;
/// use kuba_dsl::time::Calendar;
///
/// let now = Utc.with_ymd_and_hms(2020, 11, 13, 12, 0, 0).unwrap();
/// let calendar = Calendar::at(Tz::Europe__Berlin, now);
///
/// let today = calendar.today().unwrap();
/// assert_eq!(today.max - today.min, 86_399);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
    now: DateTime<Utc>,
}

impl Calendar {
    /// Calendar for `tz` using the current system time
    pub fn new(tz: Tz) -> Self {
        Self::at(tz, Utc::now())
    }

    /// Calendar for `tz` with a fixed reference instant
    pub fn at(tz: Tz, now: DateTime<Utc>) -> Self {
        Self { tz, now }
    }

    /// The timezone
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// The reference instant rendered in the zone
    pub fn now(&self) -> DateTime<Tz> {
        self.now.with_timezone(&self.tz)
    }

    /// Inclusive interval of the local calendar year `year`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the year is outside the supported range.
    pub fn year_interval(&self, year: i32) -> Result<Interval> {
        let start = ymd(year, 1, 1)?;
        let next = ymd(year.saturating_add(1), 1, 1)?;
        Ok(self.span(start, next))
    }

    /// Inclusive interval of the current local year
    pub fn this_year(&self) -> Result<Interval> {
        self.year_interval(self.now().year())
    }

    /// Inclusive interval of the local day `offset_days` away from today
    ///
    /// `0` is today, `-1` yesterday, `1` tomorrow.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the offset leaves the supported date range.
    pub fn day_interval(&self, offset_days: i64) -> Result<Interval> {
        let today = self.now().date_naive();
        let day = TimeDelta::try_days(offset_days)
            .and_then(|delta| today.checked_add_signed(delta))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("day offset {} is out of range", offset_days))
            })?;
        let next = day.succ_opt().ok_or_else(|| {
            Error::InvalidArgument(format!("day offset {} is out of range", offset_days))
        })?;
        Ok(self.span(day, next))
    }

    /// Inclusive interval of today
    pub fn today(&self) -> Result<Interval> {
        self.day_interval(0)
    }

    /// `[local midnight of start, local midnight of next - 1s]`
    fn span(&self, start: NaiveDate, next: NaiveDate) -> Interval {
        let min = local_midnight(self.tz, start);
        let max = local_midnight(self.tz, next) - 1;
        Interval::new(min, max)
    }
}

/// First instant of a local date in `tz`
pub(crate) fn local_midnight(tz: Tz, date: NaiveDate) -> i64 {
    local_to_instant_lenient(tz, date.and_time(chrono::NaiveTime::MIN))
}

/// Start (inclusive) and end (exclusive) unix seconds of the calendar period
/// containing `timestamp` in `tz`
///
/// Returns `None` when the timestamp is outside the representable date range.
pub fn period_bounds(tz: Tz, timestamp: i64, period: Period) -> Option<(i64, i64)> {
    let local = DateTime::from_timestamp(timestamp, 0)?
        .with_timezone(&tz)
        .date_naive();

    let (start, next) = match period {
        Period::Day => (local, local.succ_opt()?),
        Period::Month => {
            let start = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)?;
            let next = if local.month() == 12 {
                NaiveDate::from_ymd_opt(local.year().checked_add(1)?, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(local.year(), local.month() + 1, 1)?
            };
            (start, next)
        }
        Period::Year => (
            NaiveDate::from_ymd_opt(local.year(), 1, 1)?,
            NaiveDate::from_ymd_opt(local.year().checked_add(1)?, 1, 1)?,
        ),
    };

    Some((local_midnight(tz, start), local_midnight(tz, next)))
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::InvalidArgument(format!("year {} is out of range", year)))
}
