//! Property Tests for the Series Pipeline
//!
//! Uses property-based testing (proptest) to check the algebraic guarantees
//! of the operators over arbitrary sorted series: identifier round trips,
//! grid idempotence, M4 bounds, grouping exhaustiveness and the relations
//! between the reductions.

use proptest::prelude::*;

use kuba_dsl::identifier::Identifier;
use kuba_dsl::query::operators::{
    group_by_period, group_reduce, group_reduce_transposed, m4, reduce, snap_to_grid,
};
use kuba_dsl::time::Tz;
use kuba_dsl::types::{AggregateKind, Period, Point, Series, SeriesGroup};

// =============================================================================
// Test Data Strategies
// =============================================================================

/// Strategy for generating a series with non-decreasing timestamps
///
/// Timestamps start around 2020 and advance by up to a day, repeats included.
fn sorted_series(max_len: usize) -> impl Strategy<Value = Series> {
    prop::collection::vec((0i64..86_400, -1_000_000i64..1_000_000), 0..max_len).prop_map(
        |steps| {
            let mut x = 1_577_836_800i64;
            steps
                .into_iter()
                .map(|(delta, y)| {
                    x += delta;
                    Point::new(x, y)
                })
                .collect()
        },
    )
}

/// Strategy for generating groups of sorted series
fn sorted_group() -> impl Strategy<Value = SeriesGroup> {
    prop::collection::vec(sorted_series(40), 0..6).prop_map(SeriesGroup::from)
}

fn timezone() -> impl Strategy<Value = Tz> {
    prop_oneof![
        Just(Tz::UTC),
        Just(Tz::Europe__Berlin),
        Just(Tz::America__Sao_Paulo),
        Just(Tz::Australia__Lord_Howe),
        Just(Tz::Asia__Kathmandu),
    ]
}

fn period() -> impl Strategy<Value = Period> {
    prop_oneof![Just(Period::Day), Just(Period::Month), Just(Period::Year)]
}

// =============================================================================
// Identifier
// =============================================================================

proptest! {
    #[test]
    fn prop_identifier_round_trip(bytes in any::<[u8; 16]>()) {
        let id = Identifier::from_bytes(bytes);
        let text = id.to_string();
        prop_assert_eq!(Identifier::parse(&text).unwrap(), id);
        prop_assert_eq!(Identifier::parse(&text.replace('-', "")).unwrap(), id);
    }

    #[test]
    fn prop_identifier_rejects_wrong_length(len in 0usize..64) {
        prop_assume!(len != 32);
        let text = "a".repeat(len);
        prop_assert!(Identifier::parse(&text).is_err());
    }
}

// =============================================================================
// Grid
// =============================================================================

proptest! {
    #[test]
    fn prop_snap_idempotent(series in sorted_series(200), divisor in 1i64..100_000) {
        let once = snap_to_grid(series, divisor).unwrap();
        let twice = snap_to_grid(once.clone(), divisor).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.iter().all(|p| p.x % divisor == 0));
        prop_assert!(once.is_sorted_by_x());
    }
}

// =============================================================================
// M4
// =============================================================================

proptest! {
    #[test]
    fn prop_m4_bounds_and_extremes(series in sorted_series(500), width in 1usize..64) {
        let result = m4(series.clone(), width).unwrap();

        if series.len() <= width {
            prop_assert_eq!(result, series);
        } else {
            prop_assert!(result.len() <= 4 * width);
            prop_assert!(result.is_sorted_by_x());
            prop_assert!(result.iter().all(|p| series.contains(p)));

            let max = series.iter().map(|p| p.y).max();
            let min = series.iter().map(|p| p.y).min();
            prop_assert_eq!(result.iter().map(|p| p.y).max(), max);
            prop_assert_eq!(result.iter().map(|p| p.y).min(), min);
            prop_assert_eq!(result.first(), series.first());
            prop_assert_eq!(result.last(), series.last());
        }
    }
}

// =============================================================================
// Calendar Grouping
// =============================================================================

proptest! {
    #[test]
    fn prop_grouping_is_exhaustive(
        series in sorted_series(300),
        drift in -86_400i64..86_400,
        align in any::<bool>(),
        tz in timezone(),
        period in period(),
    ) {
        let n = series.len();
        let groups = group_by_period(series.clone(), drift, align, tz, period);

        prop_assert_eq!(groups.total_points(), n);
        prop_assert!(groups.iter().all(|s| !s.is_empty()));

        // Order and y values survive
        let ys: Vec<i64> = groups.iter().flat_map(|s| s.iter().map(|p| p.y)).collect();
        let expected: Vec<i64> = series.iter().map(|p| p.y).collect();
        prop_assert_eq!(ys, expected);

        if align {
            prop_assert!(groups.iter().all(|s| s.iter().all(|p| p.x == s[0].x)));
            prop_assert!(groups.windows(2).all(|w| w[0][0].x < w[1][0].x));
        }
    }
}

// =============================================================================
// Reductions
// =============================================================================

proptest! {
    #[test]
    fn prop_count_is_len(series in sorted_series(200)) {
        let count = reduce(&series, AggregateKind::Count);
        if series.is_empty() {
            prop_assert_eq!(count, None);
        } else {
            prop_assert_eq!(count, Some(series.len() as i64));
        }
    }

    #[test]
    fn prop_sum_avg_count(series in sorted_series(200)) {
        prop_assume!(!series.is_empty());
        let sum = reduce(&series, AggregateKind::Sum).unwrap();
        let avg = reduce(&series, AggregateKind::Avg).unwrap();
        let count = reduce(&series, AggregateKind::Count).unwrap();

        // Truncation loses strictly less than one per sample
        prop_assert!((sum - avg * count).abs() < count);
    }

    #[test]
    fn prop_min_le_avg_le_max(series in sorted_series(200)) {
        prop_assume!(!series.is_empty());
        let min = reduce(&series, AggregateKind::Min).unwrap();
        let max = reduce(&series, AggregateKind::Max).unwrap();
        let avg = reduce(&series, AggregateKind::Avg).unwrap();
        prop_assert!(min <= avg && avg <= max);
    }

    #[test]
    fn prop_group_reduce_one_per_non_empty(group in sorted_group(), kind_idx in 0usize..5) {
        let kind = AggregateKind::ALL[kind_idx];
        let result = group_reduce(&group, kind);

        let non_empty: Vec<&Series> = group.iter().filter(|s| !s.is_empty()).collect();
        prop_assert_eq!(result.len(), non_empty.len());
        for (p, s) in result.iter().zip(non_empty) {
            prop_assert_eq!(p.x, s[0].x);
            prop_assert_eq!(Some(p.y), reduce(s, kind));
        }
    }

    #[test]
    fn prop_transposed_matches_naive(group in sorted_group(), kind_idx in 0usize..5) {
        let kind = AggregateKind::ALL[kind_idx];
        let result = group_reduce_transposed(&group, kind);

        // Naive bucketing by x
        let mut buckets: std::collections::BTreeMap<i64, Vec<Point>> = Default::default();
        for p in group.iter().flat_map(|s| s.iter()) {
            buckets.entry(p.x).or_default().push(*p);
        }
        let expected: Series = buckets
            .into_iter()
            .map(|(x, points)| Point::new(x, reduce(&points, kind).unwrap()))
            .collect();

        prop_assert_eq!(result, expected);
    }
}
