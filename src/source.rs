//! Data source contract and entity metadata
//!
//! The pipeline never talks to storage itself. Handlers resolve a
//! [`DataSource`] and pass it explicitly to whatever needs series data or
//! metadata. This module defines that contract, the metadata it returns and an
//! in-memory implementation for tests and demos.
//!
//! # Example
//!
//! ```rust
//! use kuba_dsl::identifier::Identifier;
//! use kuba_dsl::source::{DataSource, InMemoryDataSource, Metric};
//! use kuba_dsl::types::{Interval, Point, Series};
//!
//! let bucket = Identifier::generate().unwrap();
//! let metric = Identifier::generate().unwrap();
//!
//! let mut source = InMemoryDataSource::new();
//! source.add_metric(Metric::new(metric, "power").with_scale(10));
//! source.add_series(bucket, metric, Series::from(vec![Point::new(0, 15), Point::new(60, 20)]));
//!
//! assert_eq!(source.scale_of(&metric).unwrap(), 10);
//! let group = source.find_in_range(&[bucket], &metric, Interval::new(0, 59)).unwrap();
//! assert_eq!(group[0].len(), 1);
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::identifier::Identifier;
use crate::time::TimeZoneName;
use crate::types::{CoverageRange, Interval, Series, SeriesGroup};

// ============================================================================
// Metadata
// ============================================================================

/// Name and description in one language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// Translated name
    pub name: String,
    /// Translated description
    pub description: String,
}

/// Entity with a default name and per-language translations
///
/// Translations are keyed by BCP-47 language tag. Matching a requested
/// language against the available tags is left to the caller.
pub trait Translated {
    /// Default (untranslated) name
    fn default_name(&self) -> &str;

    /// Translations keyed by language tag
    fn translations(&self) -> &BTreeMap<String, Translation>;

    /// Available language tags, sorted alphabetically
    fn language_tags(&self) -> Vec<&str> {
        self.translations().keys().map(String::as_str).collect()
    }

    /// Name for an already matched language tag
    ///
    /// Falls back to the default name when `tag` is `None` or has no
    /// translation.
    fn display_name(&self, tag: Option<&str>) -> &str {
        tag.and_then(|t| self.translations().get(t))
            .map(|t| t.name.as_str())
            .unwrap_or_else(|| self.default_name())
    }
}

/// A namespace of related series, usually one physical device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket identifier
    pub id: Identifier,
    /// Default name
    pub name: String,
    /// Default description
    #[serde(default)]
    pub description: String,
    /// Local timezone of the device
    #[serde(default)]
    pub timezone: TimeZoneName,
    /// Translations by language tag
    #[serde(default)]
    pub translations: BTreeMap<String, Translation>,
}

impl Bucket {
    /// Create a bucket in UTC without translations
    pub fn new(id: Identifier, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            timezone: TimeZoneName::default(),
            translations: BTreeMap::new(),
        }
    }

    /// Set the timezone
    pub fn with_timezone(mut self, timezone: TimeZoneName) -> Self {
        self.timezone = timezone;
        self
    }

    /// Add a translation
    pub fn with_translation(mut self, tag: impl Into<String>, translation: Translation) -> Self {
        self.translations.insert(tag.into(), translation);
        self
    }
}

impl Translated for Bucket {
    fn default_name(&self) -> &str {
        &self.name
    }

    fn translations(&self) -> &BTreeMap<String, Translation> {
        &self.translations
    }
}

/// A kind of measurement shared across buckets
///
/// `y` values of the metric's samples are fixed-point integers; dividing by
/// `scale` (a power of ten) yields the real value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric identifier
    pub id: Identifier,
    /// Default name
    pub name: String,
    /// Default description
    #[serde(default)]
    pub description: String,
    /// Fixed-point scale of `y`
    #[serde(default = "default_scale")]
    pub scale: i64,
    /// Nominal distance between samples in seconds, 0 if irregular
    #[serde(default)]
    pub resolution: i64,
    /// Translations by language tag
    #[serde(default)]
    pub translations: BTreeMap<String, Translation>,
}

fn default_scale() -> i64 {
    1
}

impl Metric {
    /// Create an unscaled metric without translations
    pub fn new(id: Identifier, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            scale: default_scale(),
            resolution: 0,
            translations: BTreeMap::new(),
        }
    }

    /// Set the fixed-point scale
    pub fn with_scale(mut self, scale: i64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the sample resolution in seconds
    pub fn with_resolution(mut self, resolution: i64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Add a translation
    pub fn with_translation(mut self, tag: impl Into<String>, translation: Translation) -> Self {
        self.translations.insert(tag.into(), translation);
        self
    }
}

impl Translated for Metric {
    fn default_name(&self) -> &str {
        &self.name
    }

    fn translations(&self) -> &BTreeMap<String, Translation> {
        &self.translations
    }
}

// ============================================================================
// Data Source
// ============================================================================

/// Read access to series data and metadata
///
/// Implementations are shared between concurrent requests. A missing entity
/// is `Ok(None)`; `Err` is reserved for failures of the source itself.
pub trait DataSource: Send + Sync {
    /// Metadata of a bucket
    fn bucket(&self, id: &Identifier) -> Result<Option<Bucket>>;

    /// Metadata of a metric
    fn metric(&self, id: &Identifier) -> Result<Option<Metric>>;

    /// Fixed-point scale of a metric, 1 if the metric is unknown
    fn scale_of(&self, metric_id: &Identifier) -> Result<i64> {
        match self.metric(metric_id)? {
            Some(metric) if metric.scale > 0 => Ok(metric.scale),
            Some(metric) => {
                warn!(metric = %metric_id, scale = metric.scale, "Non-positive metric scale, using 1");
                Ok(1)
            }
            None => {
                warn!(metric = %metric_id, "Unknown metric, using scale 1");
                Ok(1)
            }
        }
    }

    /// Coverage of every metric with data in any of the buckets
    ///
    /// Bounds are merged across buckets. Each range's `id` is the metric
    /// identifier and the result is sorted by it.
    fn find_ranges(&self, bucket_ids: &[Identifier]) -> Result<Vec<CoverageRange>>;

    /// Smallest and largest timestamp of one bucket's metric series
    ///
    /// The range's `id` is the metric identifier; it is not valid when the
    /// series has no data.
    fn min_max(&self, bucket_id: &Identifier, metric_id: &Identifier) -> Result<CoverageRange>;

    /// The metric's series for each bucket that has one, limited to `interval`
    ///
    /// Series are returned in the order of `bucket_ids`, sorted by `x`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `bucket_ids` is empty.
    fn find_in_range(
        &self,
        bucket_ids: &[Identifier],
        metric_id: &Identifier,
        interval: Interval,
    ) -> Result<SeriesGroup>;
}

/// Display names of buckets, one per id
///
/// See [`entity_names`].
pub fn bucket_names<S>(source: &S, ids: &[Identifier], tag: Option<&str>) -> Result<Vec<String>>
where
    S: DataSource + ?Sized,
{
    entity_names(ids, tag, |id| source.bucket(id))
}

/// Display names of metrics, one per id
///
/// See [`entity_names`].
pub fn metric_names<S>(source: &S, ids: &[Identifier], tag: Option<&str>) -> Result<Vec<String>>
where
    S: DataSource + ?Sized,
{
    entity_names(ids, tag, |id| source.metric(id))
}

/// Resolve one display name per id
///
/// Uses the translation for `tag` where one exists and the default name
/// otherwise. Ids without metadata are rendered as their canonical string.
pub fn entity_names<T, F>(ids: &[Identifier], tag: Option<&str>, mut lookup: F) -> Result<Vec<String>>
where
    T: Translated,
    F: FnMut(&Identifier) -> Result<Option<T>>,
{
    let mut names = Vec::with_capacity(ids.len());
    for id in ids {
        let name = match lookup(id)? {
            Some(entity) => entity.display_name(tag).to_string(),
            None => id.to_string(),
        };
        names.push(name);
    }
    Ok(names)
}

// ============================================================================
// In-Memory Data Source
// ============================================================================

/// Data source backed by hash maps
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    /// Bucket metadata
    buckets: HashMap<Identifier, Bucket>,

    /// Metric metadata
    metrics: HashMap<Identifier, Metric>,

    /// Series data: (bucket, metric) -> samples sorted by x
    series: HashMap<(Identifier, Identifier), Series>,
}

impl InMemoryDataSource {
    /// Create a new empty data source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace bucket metadata
    pub fn add_bucket(&mut self, bucket: Bucket) {
        self.buckets.insert(bucket.id, bucket);
    }

    /// Add or replace metric metadata
    pub fn add_metric(&mut self, metric: Metric) {
        self.metrics.insert(metric.id, metric);
    }

    /// Add or replace the series of `metric_id` in `bucket_id`
    ///
    /// Samples are sorted by `x` on insertion.
    pub fn add_series(&mut self, bucket_id: Identifier, metric_id: Identifier, mut series: Series) {
        series.sort_by_key(|p| p.x);
        self.series.insert((bucket_id, metric_id), series);
    }
}

impl DataSource for InMemoryDataSource {
    fn bucket(&self, id: &Identifier) -> Result<Option<Bucket>> {
        Ok(self.buckets.get(id).cloned())
    }

    fn metric(&self, id: &Identifier) -> Result<Option<Metric>> {
        Ok(self.metrics.get(id).cloned())
    }

    fn find_ranges(&self, bucket_ids: &[Identifier]) -> Result<Vec<CoverageRange>> {
        let mut ranges: BTreeMap<Identifier, CoverageRange> = BTreeMap::new();

        for ((bucket, metric), series) in &self.series {
            if !bucket_ids.contains(bucket) {
                continue;
            }
            let (Some(first), Some(last)) = (series.first(), series.last()) else {
                continue;
            };

            ranges
                .entry(*metric)
                .and_modify(|r| {
                    r.min_x = r.min_x.min(first.x);
                    r.max_x = r.max_x.max(last.x);
                })
                .or_insert_with(|| CoverageRange::observed(*metric, first.x, last.x));
        }

        Ok(ranges.into_values().collect())
    }

    fn min_max(&self, bucket_id: &Identifier, metric_id: &Identifier) -> Result<CoverageRange> {
        let range = self
            .series
            .get(&(*bucket_id, *metric_id))
            .and_then(|s| Some(CoverageRange::observed(*metric_id, s.first()?.x, s.last()?.x)))
            .unwrap_or_else(|| CoverageRange::empty(*metric_id));
        Ok(range)
    }

    fn find_in_range(
        &self,
        bucket_ids: &[Identifier],
        metric_id: &Identifier,
        interval: Interval,
    ) -> Result<SeriesGroup> {
        if bucket_ids.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one bucket identifier is required".to_string(),
            ));
        }

        let group = bucket_ids
            .iter()
            .filter_map(|bucket| self.series.get(&(*bucket, *metric_id)))
            .map(|series| {
                series
                    .iter()
                    .filter(|p| interval.contains(p.x))
                    .copied()
                    .collect::<Series>()
            })
            .collect();

        Ok(group)
    }
}
