//! Query layer: range parsing and the series pipeline
//!
//! A chart query flows through these stages:
//!
//! ```text
//! Range expression / Calendar
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Parse     │  "[min,max]@Zone" → inclusive Interval + Tz
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Fetch     │  DataSource → SeriesGroup
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Transform  │  scale, limit, snap, group by period
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Reduce    │  reduce, group reduce, transposed reduce
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Downscale  │  M4 to viewport width
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Unscale   │  ms timestamps, real-valued y
//! └─────────────┘
//! ```
//!
//! - [`parser`]: the range expression grammar
//! - [`operators`]: the transformation and aggregation primitives
//! - [`pipeline`]: the [`Pipeline`] facade bound to a math backend

pub mod operators;
pub mod parser;
pub mod pipeline;

pub use operators::{Intrinsics, ReferenceIntrinsics};
pub use parser::{parse_range, ParsedRange, RangeExpr};
pub use pipeline::Pipeline;
