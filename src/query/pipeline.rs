//! Pipeline facade over a pluggable math backend
//!
//! [`Pipeline`] is the entry point for chart queries. It owns the
//! [`Intrinsics`] backend that executes the operators together with the
//! per-deployment defaults (grid and viewport width) from [`Config`].
//!
//! The backend is injected at construction time. There is no process-wide
//! instance; share one `Pipeline` (it is cheap to clone) between requests.
//!
//! # Example
//!
//! ```rust
//! use kuba_dsl::query::Pipeline;
//! use kuba_dsl::types::{AggregateKind, Point, Series, NO_DRIFT, ALIGN_GROUP_START};
//! use kuba_dsl::time::Tz;
//!
//! let pipeline = Pipeline::default();
//! let series: Series = (0..48).map(|h| Point::new(h * 3600, 10)).collect();
//!
//! let days = pipeline.group_by_day(series, NO_DRIFT, ALIGN_GROUP_START, Tz::UTC);
//! let totals = pipeline.group_reduce(&days, AggregateKind::Sum);
//! assert_eq!(totals, Series::from(vec![Point::new(0, 240), Point::new(86_400, 240)]));
//! ```

use std::fmt;
use std::sync::Arc;

use chrono_tz::Tz;
use tracing::debug;

use super::operators::{Intrinsics, ReferenceIntrinsics};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{
    AggregateKind, DisplaySeries, Period, Point, Series, SeriesGroup, DEFAULT_GRID,
    DEFAULT_VIEWPORT_WIDTH,
};

/// Series transformations and reductions bound to one math backend
#[derive(Clone)]
pub struct Pipeline {
    /// Backend executing the operators
    math: Arc<dyn Intrinsics>,

    /// Divisor used by [`snap`](Self::snap)
    grid: i64,

    /// Width used by [`downscale`](Self::downscale)
    viewport_width: usize,
}

impl Pipeline {
    /// Create a pipeline on the given backend with default grid and width
    pub fn new(math: Arc<dyn Intrinsics>) -> Self {
        Self {
            math,
            grid: DEFAULT_GRID,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
        }
    }

    /// Create a reference pipeline using the defaults from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::default()
            .with_grid(config.pipeline.grid_secs)?
            .with_viewport_width(config.pipeline.viewport_width)
    }

    /// Replace the backend
    pub fn with_intrinsics<I>(mut self, math: I) -> Self
    where
        I: Intrinsics + 'static,
    {
        self.math = Arc::new(math);
        self
    }

    /// Set the default grid divisor in seconds
    pub fn with_grid(mut self, grid: i64) -> Result<Self> {
        if grid <= 0 {
            return Err(Error::InvalidArgument(format!(
                "grid divisor must be positive, got {}",
                grid
            )));
        }
        self.grid = grid;
        Ok(self)
    }

    /// Set the default viewport width in pixels
    pub fn with_viewport_width(mut self, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(Error::InvalidArgument(
                "viewport width must be positive".to_string(),
            ));
        }
        self.viewport_width = width;
        Ok(self)
    }

    /// The backend in use
    pub fn intrinsics(&self) -> &Arc<dyn Intrinsics> {
        &self.math
    }

    /// Default grid divisor
    pub fn grid(&self) -> i64 {
        self.grid
    }

    /// Default viewport width
    pub fn viewport_width(&self) -> usize {
        self.viewport_width
    }

    // ------------------------------------------------------------------------
    // Transformations
    // ------------------------------------------------------------------------

    /// Multiply `x` and `y` of every sample
    pub fn scale(&self, series: Series, x_factor: i64, y_factor: i64) -> Series {
        self.math.scale(series, x_factor, y_factor)
    }

    /// Keep samples with `min <= y <= max`
    pub fn limit(&self, series: Series, min: i64, max: i64) -> Series {
        self.math.limit(series, min, max)
    }

    /// Snap every `x` onto a grid of `divisor` seconds
    pub fn snap_to_grid(&self, series: Series, divisor: i64) -> Result<Series> {
        self.math.snap_to_grid(series, divisor)
    }

    /// Snap every `x` onto the configured grid
    pub fn snap(&self, series: Series) -> Result<Series> {
        self.math.snap_to_grid(series, self.grid)
    }

    /// Partition by calendar period in `tz`
    pub fn group_by_period(
        &self,
        series: Series,
        drift: i64,
        align: bool,
        tz: Tz,
        period: Period,
    ) -> SeriesGroup {
        self.math.group_by_period(series, drift, align, tz, period)
    }

    /// Partition by local day
    pub fn group_by_day(&self, series: Series, drift: i64, align: bool, tz: Tz) -> SeriesGroup {
        self.group_by_period(series, drift, align, tz, Period::Day)
    }

    /// Partition by local month
    pub fn group_by_month(&self, series: Series, drift: i64, align: bool, tz: Tz) -> SeriesGroup {
        self.group_by_period(series, drift, align, tz, Period::Month)
    }

    /// Partition by local year
    pub fn group_by_year(&self, series: Series, drift: i64, align: bool, tz: Tz) -> SeriesGroup {
        self.group_by_period(series, drift, align, tz, Period::Year)
    }

    /// M4 downsampling to `width` buckets
    pub fn m4(&self, series: Series, width: usize) -> Result<Series> {
        self.math.m4(series, width)
    }

    /// Drop samples that are invisible at `width` pixels
    ///
    /// Uses the default visual reduction, which is currently M4.
    pub fn downscale_to(&self, series: Series, width: usize) -> Result<Series> {
        self.m4(series, width)
    }

    /// [`downscale_to`](Self::downscale_to) with the configured viewport width
    pub fn downscale(&self, series: Series) -> Result<Series> {
        self.m4(series, self.viewport_width)
    }

    /// Terminal conversion to milliseconds and real units
    pub fn unscale(&self, series: &Series, y_scale: i64) -> Result<DisplaySeries> {
        series.unscale(y_scale)
    }

    // ------------------------------------------------------------------------
    // Aggregation
    // ------------------------------------------------------------------------

    /// Reduce one series; `None` when there is nothing to reduce
    pub fn reduce(&self, points: &[Point], kind: AggregateKind) -> Option<i64> {
        self.math.reduce(points, kind)
    }

    /// One sample per inner series, stamped with its first `x`
    pub fn group_reduce(&self, group: &SeriesGroup, kind: AggregateKind) -> Series {
        let result = self.math.group_reduce(group, kind);
        debug!(
            backend = self.math.name(),
            series = group.len(),
            output = result.len(),
            %kind,
            "group reduce"
        );
        result
    }

    /// One sample per distinct `x` across all inner series
    pub fn group_reduce_transposed(&self, group: &SeriesGroup, kind: AggregateKind) -> Series {
        let result = self.math.group_reduce_transposed(group, kind);
        debug!(
            backend = self.math.name(),
            series = group.len(),
            output = result.len(),
            %kind,
            "transposed group reduce"
        );
        result
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Arc::new(ReferenceIntrinsics))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("backend", &self.math.name())
            .field("grid", &self.grid)
            .field("viewport_width", &self.viewport_width)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ALIGN_GROUP_START, NO_DRIFT};

    #[test]
    fn test_defaults() {
        let pipeline = Pipeline::default();
        assert_eq!(pipeline.grid(), DEFAULT_GRID);
        assert_eq!(pipeline.viewport_width(), DEFAULT_VIEWPORT_WIDTH);
        assert_eq!(pipeline.intrinsics().name(), "reference");
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.pipeline.grid_secs = 900;
        config.pipeline.viewport_width = 64;

        let pipeline = Pipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.grid(), 900);
        assert_eq!(pipeline.viewport_width(), 64);

        config.pipeline.grid_secs = 0;
        assert!(Pipeline::from_config(&config).is_err());
    }

    #[test]
    fn test_snap_group_reduce_chain() {
        let pipeline = Pipeline::default();
        let series: Series = (0..6).map(|i| Point::new(i * 43_200 + 17, i)).collect();

        let snapped = pipeline.snap(series).unwrap();
        assert!(snapped.iter().all(|p| p.x % DEFAULT_GRID == 0));

        let days = pipeline.group_by_day(snapped, NO_DRIFT, ALIGN_GROUP_START, Tz::UTC);
        assert_eq!(days.len(), 3);

        let avg = pipeline.group_reduce(&days, AggregateKind::Avg);
        assert_eq!(
            avg,
            Series::from(vec![
                Point::new(0, 0),
                Point::new(86_400, 2),
                Point::new(172_800, 4),
            ])
        );
    }

    #[test]
    fn test_downscale_uses_viewport_width() {
        let pipeline = Pipeline::default().with_viewport_width(10).unwrap();
        let series: Series = (0..1_000).map(|i| Point::new(i, i % 17)).collect();
        let result = pipeline.downscale(series).unwrap();
        assert!(result.len() <= 40);
    }

    #[test]
    fn test_concurrent_use() {
        let pipeline = Pipeline::default();
        let group: SeriesGroup = (0..8)
            .map(|s| (0..100).map(|i| Point::new(i * 60, i + s)).collect::<Series>())
            .collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let pipeline = pipeline.clone();
                    let group = group.clone();
                    scope.spawn(move || pipeline.group_reduce_transposed(&group, AggregateKind::Sum))
                })
                .collect();

            let expected = pipeline.group_reduce_transposed(&group, AggregateKind::Sum);
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
