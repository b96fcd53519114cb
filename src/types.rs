//! Core data types used throughout the query pipeline
//!
//! This module defines the value types that flow between the data source,
//! the transformation pipeline and the response serializer:
//!
//! # Key Types
//!
//! - **`Point`**: A single fixed-point sample (unix seconds + pre-scaled integer)
//! - **`Series`**: Samples of one series, ordered by non-decreasing `x`
//! - **`SeriesGroup`**: Several series, e.g. one per bucket for a metric
//! - **`DisplayPoint`** / **`DisplaySeries`** / **`DisplaySeriesGroup`**:
//!   floating point, millisecond based output of the terminal unscale step
//! - **`Interval`**: Inclusive `[min, max]` range of unix seconds
//! - **`CoverageRange`**: Observed data coverage reported by the data source
//! - **`AggregateKind`**: Reduction selector (Min, Max, Avg, Sum, Count)
//! - **`Period`**: Calendar period used for grouping (Day, Month, Year)
//!
//! # Example
//!
//! ```rust
//! use kuba_dsl::types::{Point, Series};
//!
//! let series = Series::from(vec![Point::new(0, 10), Point::new(60, 12)]);
//! assert_eq!(series.len(), 2);
//! assert_eq!(series.last(), Some(&Point::new(60, 12)));
//!
//! let display = series.unscale(10).unwrap();
//! assert_eq!(display[1].x, 60_000);
//! assert_eq!(display[1].y, 1.2);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::{Error, Result};
use crate::identifier::Identifier;

/// Drift literal for "do not shift timestamps before grouping"
pub const NO_DRIFT: i64 = 0;

/// Align literal for "snap each group to the canonical start of its period"
pub const ALIGN_GROUP_START: bool = true;

/// Default grid size in seconds for `snap_to_grid`
pub const DEFAULT_GRID: i64 = 600;

/// Default chart width used as M4 bucket count when the caller has no hint
pub const DEFAULT_VIEWPORT_WIDTH: usize = 512;

/// A single fixed-point sample
///
/// `x` is usually seconds since the unix epoch. `y` is a pre-scaled integer;
/// the factor converting it into a real unit is a property of the metric,
/// not of the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Timestamp, usually unix seconds
    pub x: i64,
    /// Pre-scaled amplitude
    pub y: i64,
}

impl Point {
    /// Create a new sample
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Display-only sample produced by [`Series::unscale`]
///
/// Floating point values are the last step of processing. They are never fed
/// back into integer-domain operations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayPoint {
    /// Timestamp in milliseconds since the unix epoch
    pub x: i64,
    /// Real amplitude, ready to display
    pub y: f64,
}

/// Ordered samples of a single time series
///
/// Every transformation expects non-decreasing `x`. Grouping and downsampling
/// results are unspecified when this is violated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series(Vec<Point>);

impl Series {
    /// Create an empty series
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create an empty series with room for `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Append a sample
    pub fn push(&mut self, point: Point) {
        self.0.push(point);
    }

    /// Consume the series and return the underlying samples
    pub fn into_inner(self) -> Vec<Point> {
        self.0
    }

    /// Returns true if the samples are ordered by non-decreasing `x`
    pub fn is_sorted_by_x(&self) -> bool {
        self.0.windows(2).all(|w| w[0].x <= w[1].x)
    }

    /// Convert into display samples: `x * 1000` and `y / y_scale`
    ///
    /// This must be the last step of a pipeline. It allocates a new buffer and
    /// its output is unsuitable for further integer transformations.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `y_scale` is zero.
    pub fn unscale(&self, y_scale: i64) -> Result<DisplaySeries> {
        if y_scale == 0 {
            return Err(Error::InvalidArgument(
                "y scale must not be zero".to_string(),
            ));
        }

        let scale = y_scale as f64;
        Ok(DisplaySeries(
            self.0
                .iter()
                .map(|p| DisplayPoint {
                    x: p.x.saturating_mul(1000),
                    y: p.y as f64 / scale,
                })
                .collect(),
        ))
    }
}

impl Deref for Series {
    type Target = Vec<Point>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Series {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Point>> for Series {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl FromIterator<Point> for Series {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Series {
    type Item = Point;
    type IntoIter = std::vec::IntoIter<Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Ordered collection of series, e.g. one per bucket for a metric
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesGroup(Vec<Series>);

impl SeriesGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Consume the group and return its series
    pub fn into_inner(self) -> Vec<Series> {
        self.0
    }

    /// Total number of samples across all series
    pub fn total_points(&self) -> usize {
        self.0.iter().map(|s| s.len()).sum()
    }

    /// Replace each series by `f(series)`
    ///
    /// The group owns its series, so the transformation runs in place and
    /// does not allocate a new outer buffer.
    pub fn for_each<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(Series) -> Series,
    {
        for slot in self.0.iter_mut() {
            let series = std::mem::take(slot);
            *slot = f(series);
        }
        self
    }

    /// Like [`for_each`](Self::for_each), but fallible
    pub fn try_for_each<F>(mut self, mut f: F) -> Result<Self>
    where
        F: FnMut(Series) -> Result<Series>,
    {
        for slot in self.0.iter_mut() {
            let series = std::mem::take(slot);
            *slot = f(series)?;
        }
        Ok(self)
    }

    /// Transform each series into a display series
    pub fn for_each_display<F>(&self, mut f: F) -> Result<DisplaySeriesGroup>
    where
        F: FnMut(&Series) -> Result<DisplaySeries>,
    {
        let mut out = Vec::with_capacity(self.0.len());
        for series in &self.0 {
            out.push(f(series)?);
        }
        Ok(DisplaySeriesGroup(out))
    }
}

impl Deref for SeriesGroup {
    type Target = Vec<Series>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SeriesGroup {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Series>> for SeriesGroup {
    fn from(series: Vec<Series>) -> Self {
        Self(series)
    }
}

impl FromIterator<Series> for SeriesGroup {
    fn from_iter<I: IntoIterator<Item = Series>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for SeriesGroup {
    type Item = Series;
    type IntoIter = std::vec::IntoIter<Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Display samples of one series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplaySeries(Vec<DisplayPoint>);

impl DisplaySeries {
    /// Consume the series and return the underlying samples
    pub fn into_inner(self) -> Vec<DisplayPoint> {
        self.0
    }
}

impl Deref for DisplaySeries {
    type Target = Vec<DisplayPoint>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<DisplayPoint>> for DisplaySeries {
    fn from(points: Vec<DisplayPoint>) -> Self {
        Self(points)
    }
}

/// Display series of a group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplaySeriesGroup(Vec<DisplaySeries>);

impl DisplaySeriesGroup {
    /// Append the series of `other` to this group
    pub fn join(mut self, other: DisplaySeriesGroup) -> Self {
        self.0.extend(other.0);
        self
    }
}

impl Deref for DisplaySeriesGroup {
    type Target = Vec<DisplaySeries>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<DisplaySeries>> for DisplaySeriesGroup {
    fn from(series: Vec<DisplaySeries>) -> Self {
        Self(series)
    }
}

/// Inclusive time interval in unix seconds
///
/// Both ends are inclusive: a sample at `min` or at `max` lies inside.
///
/// # Example
///
/// ```rust
/// use kuba_dsl::types::Interval;
///
/// let interval = Interval::new(100, 200);
/// assert!(interval.contains(100));
/// assert!(interval.contains(200));
/// assert!(!interval.contains(201));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// First second (inclusive)
    pub min: i64,
    /// Last second (inclusive)
    pub max: i64,
}

impl Interval {
    /// Create an interval; `min <= max` is expected but not enforced
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Check if a timestamp lies within the interval (inclusive)
    pub fn contains(&self, x: i64) -> bool {
        x >= self.min && x <= self.max
    }

    /// Returns true if `min > max`
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

/// Observed coverage of a series as reported by the data source
///
/// The meaning of `id` depends on the producing call: it may name a metric,
/// a bucket or a bucket specific series. `valid` is false when nothing has
/// been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRange {
    /// Identifier the coverage belongs to
    pub id: Identifier,
    /// Smallest observed `x`
    pub min_x: i64,
    /// Largest observed `x`
    pub max_x: i64,
    /// Whether any data has been observed
    pub valid: bool,
}

impl CoverageRange {
    /// Coverage for the given id with observed bounds
    pub fn observed(id: Identifier, min_x: i64, max_x: i64) -> Self {
        Self {
            id,
            min_x,
            max_x,
            valid: true,
        }
    }

    /// Coverage for an id without any observed data
    pub fn empty(id: Identifier) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// The observed bounds as an inclusive interval
    pub fn interval(&self) -> Option<Interval> {
        self.valid.then(|| Interval::new(self.min_x, self.max_x))
    }
}

/// Reduction applied by `reduce` and the group reductions
///
/// On the wire this is the ordinal (`Min = 1` .. `Count = 5`); anything outside
/// that contiguous range is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AggregateKind {
    /// Smallest `y`
    Min = 1,
    /// Largest `y`
    Max = 2,
    /// Mean `y`, truncated toward zero
    Avg = 3,
    /// Sum of `y`
    Sum = 4,
    /// Number of samples
    Count = 5,
}

impl AggregateKind {
    /// All kinds in ordinal order
    pub const ALL: [AggregateKind; 5] = [
        AggregateKind::Min,
        AggregateKind::Max,
        AggregateKind::Avg,
        AggregateKind::Sum,
        AggregateKind::Count,
    ];

    /// Check whether an ordinal denotes a valid kind
    pub fn is_valid_ordinal(ordinal: i64) -> bool {
        (AggregateKind::Min as i64..=AggregateKind::Count as i64).contains(&ordinal)
    }

    /// Lower-case name, as accepted by [`str::parse`]
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
            AggregateKind::Avg => "avg",
            AggregateKind::Sum => "sum",
            AggregateKind::Count => "count",
        }
    }
}

impl TryFrom<i64> for AggregateKind {
    type Error = Error;

    fn try_from(ordinal: i64) -> Result<Self> {
        if !Self::is_valid_ordinal(ordinal) {
            return Err(Error::InvalidArgument(format!(
                "aggregate kind ordinal {} is out of range [1, 5]",
                ordinal
            )));
        }
        Ok(Self::ALL[(ordinal - 1) as usize])
    }
}

impl From<AggregateKind> for i64 {
    fn from(kind: AggregateKind) -> Self {
        kind as i64
    }
}

impl std::str::FromStr for AggregateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == lower)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown aggregate kind '{}'", s)))
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calendar period used by `group_by_period`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Local calendar day
    Day,
    /// Local calendar month
    Month,
    /// Local calendar year
    Year,
}

impl std::str::FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(Error::InvalidArgument(format!("unknown period '{}'", other))),
        }
    }
}
