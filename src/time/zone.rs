//! IANA timezone names and local time resolution
//!
//! A timezone is not an offset: it names a place and carries the full history
//! of offsets and daylight-saving rules for it. All calendar calculations in
//! this crate take a resolved [`Tz`] for that reason.

use chrono::{LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Resolve an IANA timezone name such as `Europe/Berlin`
///
/// Surrounding whitespace is ignored.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidTimezone("empty timezone name".to_string()));
    }

    trimmed
        .parse::<Tz>()
        .map_err(|e| Error::InvalidTimezone(format!("'{}': {}", trimmed, e)))
}

/// Interpret a local wall-clock time in `tz`, strictly
///
/// Ambiguous times (the repeated hour when clocks go back) resolve to the
/// earlier instant. Times that do not exist (skipped by a forward jump) are
/// rejected with `InvalidDateTime`.
pub fn local_to_instant(tz: Tz, local: NaiveDateTime) -> Result<i64> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.timestamp()),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp()),
        LocalResult::None => Err(Error::InvalidDateTime(format!(
            "'{}' does not exist in {}",
            local, tz
        ))),
    }
}

/// Interpret a local wall-clock time in `tz`, leniently
///
/// Like [`local_to_instant`], except that a skipped local time is moved
/// forward by the length of the gap, which yields the first existing instant
/// at or after it. Used for calendar boundaries, where midnight may not exist
/// in zones that switch daylight-saving time at 00:00.
pub(crate) fn local_to_instant_lenient(tz: Tz, local: NaiveDateTime) -> i64 {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.timestamp(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp(),
        LocalResult::None => {
            // Use the offset in effect before the gap
            let before = local
                .checked_sub_signed(TimeDelta::days(1))
                .unwrap_or(local);
            let offset = tz.offset_from_utc_datetime(&before).fix().local_minus_utc();
            local.and_utc().timestamp() - i64::from(offset)
        }
    }
}

/// Unparsed IANA timezone name, validated during deserialization
///
/// Keeps the original text for round trips while guaranteeing that it
/// resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TimeZoneName(String);

impl TimeZoneName {
    /// Validate and wrap a name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        parse_timezone(&name)?;
        Ok(Self(name))
    }

    /// Resolve the zone
    pub fn parse(&self) -> Result<Tz> {
        parse_timezone(&self.0)
    }

    /// The name as given
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TimeZoneName {
    fn default() -> Self {
        Self("Etc/UTC".to_string())
    }
}

impl fmt::Display for TimeZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TimeZoneName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for TimeZoneName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        TimeZoneName::new(name).map_err(serde::de::Error::custom)
    }
}
