//! Kuba DSL - Query-time pipeline for fixed-point time series
//!
//! This library turns raw series from a time-series store into chart-ready
//! data:
//! - Range expressions (`[min,max]@Zone`) and calendar intervals
//! - Scaling, value limits and grid snapping
//! - Calendar grouping by local day, month and year
//! - Scalar, grouped and transposed reductions
//! - M4 downsampling to the viewport width
//!
//! # Example
//!
//! ```rust
//! use kuba_dsl::query::{parse_range, Pipeline};
//! use kuba_dsl::types::{AggregateKind, Point, Series, NO_DRIFT, ALIGN_GROUP_START};
//!
//! let range = parse_range("[2020-11-13 00:00:00,2020-11-14 23:59:59]@Europe/Berlin").unwrap();
//! let pipeline = Pipeline::default();
//!
//! let series: Series = (0..48)
//!     .map(|h| Point::new(range.interval.min + h * 3600, 5))
//!     .collect();
//! let days = pipeline.group_by_day(series, NO_DRIFT, ALIGN_GROUP_START, range.timezone);
//! let per_day = pipeline.group_reduce(&days, AggregateKind::Sum);
//!
//! assert_eq!(per_day.len(), 2);
//! assert_eq!(per_day[0], Point::new(range.interval.min, 120));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod identifier;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Data source contract and entity metadata
pub mod source;

/// Timezone resolution and calendar intervals
pub mod time;

/// Range parsing, series operators and the pipeline facade
pub mod query;

// Re-export main types
pub use error::{Error, Result};
pub use identifier::{Identifier, Identifiers};
pub use query::{Intrinsics, Pipeline, ReferenceIntrinsics};
pub use types::{AggregateKind, Interval, Period, Point, Series, SeriesGroup};
