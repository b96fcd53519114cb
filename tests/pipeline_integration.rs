//! End-to-end tests: data source → pipeline → display series
//!
//! These follow the path a chart handler takes: resolve an interval, fetch a
//! group for a metric across buckets, shape it with the pipeline and finish
//! with the terminal unscale step.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use kuba_dsl::identifier::{Identifier, Identifiers};
use kuba_dsl::query::{parse_range, Intrinsics, Pipeline, ReferenceIntrinsics};
use kuba_dsl::source::{bucket_names, Bucket, DataSource, InMemoryDataSource, Metric, Translation};
use kuba_dsl::time::{Calendar, Tz};
use kuba_dsl::types::{
    AggregateKind, DisplaySeriesGroup, Interval, Point, Series, SeriesGroup, ALIGN_GROUP_START,
    NO_DRIFT,
};

// =============================================================================
// Fixtures
// =============================================================================

struct Fixture {
    source: InMemoryDataSource,
    buckets: Identifiers,
    power: Identifier,
}

/// Two turbines reporting power every 10 minutes for three Berlin days
fn create_fixture() -> Fixture {
    let turbine_a = Identifier::parse("5a1f3e2c-0000-4000-8000-000000000001").unwrap();
    let turbine_b = Identifier::parse("5a1f3e2c-0000-4000-8000-000000000002").unwrap();
    let power = Identifier::parse("5a1f3e2c-0000-4000-8000-0000000000aa").unwrap();

    let start = berlin_midnight(2020, 11, 13);
    let a: Series = (0..3 * 144)
        .map(|i| Point::new(start + i * 600 + 7, 1_000 + (i % 144)))
        .collect();
    let b: Series = (0..3 * 144)
        .map(|i| Point::new(start + i * 600 + 13, 2_000))
        .collect();

    let mut source = InMemoryDataSource::new();
    source.add_bucket(
        Bucket::new(turbine_a, "Turbine A").with_translation(
            "de",
            Translation {
                name: "Windrad A".to_string(),
                description: String::new(),
            },
        ),
    );
    source.add_metric(Metric::new(power, "Power").with_scale(10).with_resolution(600));
    source.add_series(turbine_a, power, a);
    source.add_series(turbine_b, power, b);

    Fixture {
        source,
        buckets: Identifiers::from(vec![turbine_a, turbine_b]),
        power,
    }
}

fn berlin_midnight(y: i32, m: u32, d: u32) -> i64 {
    Tz::Europe__Berlin
        .with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap()
        .timestamp()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_daily_energy_per_turbine() {
    let fx = create_fixture();
    let pipeline = Pipeline::default();

    let range = parse_range("[2020-11-13 00:00:00,2020-11-16 00:00:00)@Europe/Berlin").unwrap();
    let group = fx
        .source
        .find_in_range(&fx.buckets, &fx.power, range.interval)
        .unwrap();
    assert_eq!(group.len(), 2);
    assert_eq!(group.total_points(), 2 * 3 * 144);

    let daily: SeriesGroup = group.for_each(|series| {
        let days = pipeline.group_by_day(series, NO_DRIFT, ALIGN_GROUP_START, range.timezone);
        pipeline.group_reduce(&days, AggregateKind::Sum)
    });

    let expected_a: i64 = (0..144).map(|i| 1_000 + i).sum();
    for (i, day) in [13, 14, 15].into_iter().enumerate() {
        assert_eq!(daily[0][i], Point::new(berlin_midnight(2020, 11, day), expected_a));
        assert_eq!(daily[1][i], Point::new(berlin_midnight(2020, 11, day), 144 * 2_000));
    }

    let scale = fx.source.scale_of(&fx.power).unwrap();
    let display = daily
        .for_each_display(|series| pipeline.unscale(series, scale))
        .unwrap();
    assert_eq!(display[1][0].x, berlin_midnight(2020, 11, 13) * 1_000);
    assert_eq!(display[1][0].y, 28_800.0);
}

#[test]
fn test_fleet_total_over_grid() {
    let fx = create_fixture();
    let pipeline = Pipeline::default();

    let range = parse_range("[2020-11-13 00:00:00,2020-11-13 01:00:00)@Europe/Berlin").unwrap();
    let group = fx
        .source
        .find_in_range(&fx.buckets, &fx.power, range.interval)
        .unwrap();

    // Samples are a few seconds off the grid; snapping lines them up
    let snapped = group.try_for_each(|s| pipeline.snap(s)).unwrap();
    let total = pipeline.group_reduce_transposed(&snapped, AggregateKind::Sum);

    assert_eq!(total.len(), 6);
    let start = berlin_midnight(2020, 11, 13);
    for (i, p) in total.iter().enumerate() {
        assert_eq!(p.x, start + i as i64 * 600);
        assert_eq!(p.y, 1_000 + i as i64 + 2_000);
    }

    let count = pipeline.group_reduce_transposed(&snapped, AggregateKind::Count);
    assert!(count.iter().all(|p| p.y == 2));
}

#[test]
fn test_downscale_then_unscale() {
    let fx = create_fixture();
    let pipeline = Pipeline::default().with_viewport_width(20).unwrap();

    let coverage = fx.source.min_max(&fx.buckets.first().unwrap(), &fx.power).unwrap();
    let interval = coverage.interval().unwrap();

    let group = fx
        .source
        .find_in_range(&fx.buckets[..1], &fx.power, interval)
        .unwrap();
    let series = group.into_inner().remove(0);
    assert_eq!(series.len(), 432);

    let reduced = pipeline.downscale(series).unwrap();
    assert!(reduced.len() <= 80);
    assert!(reduced.is_sorted_by_x());
    assert!(reduced.iter().any(|p| p.y == 1_143));
    assert!(reduced.iter().any(|p| p.y == 1_000));

    let display = pipeline.unscale(&reduced, 10).unwrap();
    assert_eq!(display.len(), reduced.len());
    assert_eq!(display[0].y, 100.0);
}

#[test]
fn test_group_join_of_display_groups() {
    let fx = create_fixture();
    let pipeline = Pipeline::default();
    let interval = Interval::new(berlin_midnight(2020, 11, 13), berlin_midnight(2020, 11, 13) + 3_599);

    let a = fx
        .source
        .find_in_range(&fx.buckets[..1], &fx.power, interval)
        .unwrap()
        .for_each_display(|s| pipeline.unscale(s, 10))
        .unwrap();
    let b = fx
        .source
        .find_in_range(&fx.buckets[1..], &fx.power, interval)
        .unwrap()
        .for_each_display(|s| pipeline.unscale(s, 10))
        .unwrap();

    let joined: DisplaySeriesGroup = a.join(b);
    assert_eq!(joined.len(), 2);
    assert_eq!(joined[1][0].y, 200.0);
}

#[test]
fn test_names_and_coverage() {
    let fx = create_fixture();

    let names = bucket_names(&fx.source, &fx.buckets, Some("de")).unwrap();
    assert_eq!(names[0], "Windrad A");
    // No metadata for the second turbine: its id is used
    assert_eq!(names[1], fx.buckets[1].to_string());

    let ranges = fx.source.find_ranges(&fx.buckets).unwrap();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].id, fx.power);
    assert_eq!(ranges[0].min_x, berlin_midnight(2020, 11, 13) + 7);
}

#[test]
fn test_calendar_intervals_feed_the_source() {
    let fx = create_fixture();
    let now = Utc.with_ymd_and_hms(2020, 11, 15, 12, 0, 0).unwrap();
    let calendar = Calendar::at(Tz::Europe__Berlin, now);

    let yesterday = calendar.day_interval(-1).unwrap();
    assert_eq!(yesterday.min, berlin_midnight(2020, 11, 14));
    assert_eq!(yesterday.max, berlin_midnight(2020, 11, 15) - 1);

    let group = fx
        .source
        .find_in_range(&fx.buckets, &fx.power, yesterday)
        .unwrap();
    assert!(group.iter().all(|s| s.len() == 144));

    let year = calendar.this_year().unwrap();
    let group = fx.source.find_in_range(&fx.buckets, &fx.power, year).unwrap();
    assert_eq!(group.total_points(), 2 * 3 * 144);
}

/// Backend that answers every reduction with the reference but keeps a tally
struct TallyIntrinsics {
    inner: ReferenceIntrinsics,
    reductions: std::sync::atomic::AtomicUsize,
}

impl Intrinsics for TallyIntrinsics {
    fn group_reduce(&self, group: &SeriesGroup, kind: AggregateKind) -> Series {
        self.reductions
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.group_reduce(group, kind)
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

#[test]
fn test_swapped_backend_matches_reference() {
    let fx = create_fixture();
    let backend = Arc::new(TallyIntrinsics {
        inner: ReferenceIntrinsics,
        reductions: std::sync::atomic::AtomicUsize::new(0),
    });
    let custom = Pipeline::new(backend.clone());
    let reference = Pipeline::default();

    let range = parse_range("[2020-11-13 00:00:00,2020-11-15 23:59:59]@Europe/Berlin").unwrap();
    let group = fx
        .source
        .find_in_range(&fx.buckets, &fx.power, range.interval)
        .unwrap();

    for kind in AggregateKind::ALL {
        let days_custom = custom.group_by_day(group[0].clone(), NO_DRIFT, true, range.timezone);
        let days_reference = reference.group_by_day(group[0].clone(), NO_DRIFT, true, range.timezone);
        assert_eq!(
            custom.group_reduce(&days_custom, kind),
            reference.group_reduce(&days_reference, kind)
        );
    }
    assert_eq!(
        backend.reductions.load(std::sync::atomic::Ordering::SeqCst),
        AggregateKind::ALL.len()
    );
}
