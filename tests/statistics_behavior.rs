//! Behavior-driven tests for holder-distribution statistics
//!
//! These tests pin the numeric contract: defined values for the edge cases,
//! known values for reference distributions, and failures that are never
//! coerced into a number.

use rust_decimal::Decimal;
use tokenlens_core::stats::{
    gini, mean, median, nakamoto_coefficient, percent_change, sum, theil_index, top_share,
    DEFAULT_NAKAMOTO_THRESHOLD,
};
use tokenlens_core::{
    CalendarDate, ComputationError, DerivedStatistics, HolderRecord, HolderSnapshot,
};

fn balances(values: &[i64]) -> Vec<Decimal> {
    values.iter().copied().map(Decimal::from).collect()
}

fn snapshot(values: &[&str]) -> HolderSnapshot {
    let holders = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            HolderRecord::new(
                format!("0x{:040x}", index + 1),
                value.parse::<Decimal>().expect("valid decimal"),
            )
        })
        .collect();
    HolderSnapshot::new(CalendarDate::parse("2025-03-01").expect("valid date"), holders)
}

// =============================================================================
// Reference distributions
// =============================================================================

#[test]
fn equal_balances_have_no_inequality() {
    // Given: four holders with identical balances
    let values = balances(&[250, 250, 250, 250]);

    // Then: both inequality measures are exactly zero
    assert_eq!(gini(&values).expect("gini"), 0.0);
    assert_eq!(theil_index(&values).expect("theil"), 0.0);
}

#[test]
fn a_single_owner_is_the_nakamoto_coefficient() {
    // Given: one holder owns the entire supply
    let values = balances(&[1_000_000, 0, 0]);

    // Then: one holder is enough to exceed 51%
    assert_eq!(
        nakamoto_coefficient(&values, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto"),
        1
    );
    assert_eq!(gini(&values).expect("gini"), 1.0);
}

#[test]
fn skewed_five_holder_distribution_matches_reference_values() {
    // Given: [10, 10, 10, 10, 60]
    let values = balances(&[10, 10, 10, 10, 60]);

    // Then: the sample-corrected Gini is 0.5 and one holder controls 60%
    assert!((gini(&values).expect("gini") - 0.5).abs() < 1e-12);
    assert_eq!(
        nakamoto_coefficient(&values, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto"),
        1
    );

    // And: the summary statistics follow
    assert_eq!(sum(&values).expect("sum"), Decimal::from(100));
    assert_eq!(mean(&values).expect("mean"), Some(Decimal::from(20)));
    assert_eq!(median(&values).expect("median"), Some(Decimal::from(10)));
    assert_eq!(
        top_share(&values, 1).expect("top share"),
        Some(Decimal::new(6, 1))
    );
}

#[test]
fn nakamoto_requires_strictly_exceeding_the_threshold() {
    // Given: two holders at exactly half each
    let values = balances(&[50, 50]);

    // Then: half is not a majority at 0.5, so both are needed
    assert_eq!(
        nakamoto_coefficient(&values, Decimal::new(5, 1)).expect("nakamoto"),
        2
    );
}

// =============================================================================
// Edge cases with defined values
// =============================================================================

#[test]
fn empty_snapshot_yields_zero_or_absent_statistics() {
    // Given: an empty holder snapshot
    let statistics = DerivedStatistics::from_snapshot(&snapshot(&[]), DEFAULT_NAKAMOTO_THRESHOLD)
        .expect("empty input is defined");

    // Then: counts and indices are zero and averages are absent
    assert_eq!(statistics.holder_count, 0);
    assert_eq!(statistics.total_balance, Decimal::ZERO);
    assert_eq!(statistics.gini, 0.0);
    assert_eq!(statistics.theil, 0.0);
    assert_eq!(statistics.nakamoto, 0);
    assert_eq!(statistics.mean_balance, None);
    assert_eq!(statistics.median_balance, None);
    assert_eq!(statistics.top1_share, None);
}

#[test]
fn zero_supply_is_not_concentrated() {
    // Given: holders that all hold nothing
    let values = balances(&[0, 0, 0]);

    // Then: no division by zero leaks out
    assert_eq!(gini(&values).expect("gini"), 0.0);
    assert_eq!(theil_index(&values).expect("theil"), 0.0);
    assert_eq!(
        nakamoto_coefficient(&values, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto"),
        0
    );
    assert_eq!(top_share(&values, 10).expect("top share"), None);
}

#[test]
fn percent_change_from_zero_is_absent() {
    // Then: a zero baseline has no defined change for any new value
    for new in [Decimal::ZERO, Decimal::ONE, Decimal::from(-7), Decimal::MAX] {
        assert_eq!(percent_change(Decimal::ZERO, new), None);
    }

    // And: a regular change is expressed in percent
    assert_eq!(
        percent_change(Decimal::from(200), Decimal::from(250)),
        Some(Decimal::from(25))
    );
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn negative_balances_are_rejected_with_the_holder_address() {
    // Given: a snapshot containing a negative balance
    let error = DerivedStatistics::from_snapshot(
        &snapshot(&["10", "-0.5", "3"]),
        DEFAULT_NAKAMOTO_THRESHOLD,
    )
    .expect_err("negative balance must fail");

    // Then: the failure names the offending holder
    assert_eq!(
        error,
        ComputationError::NegativeBalance {
            address: format!("0x{:040x}", 2),
            balance: String::from("-0.5"),
        }
    );
}

#[test]
fn thresholds_outside_the_unit_interval_are_rejected() {
    let values = balances(&[1, 2, 3]);
    for threshold in [Decimal::ZERO, Decimal::ONE, Decimal::from(2)] {
        assert!(matches!(
            nakamoto_coefficient(&values, threshold),
            Err(ComputationError::InvalidThreshold { .. })
        ));
    }
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn gini_and_theil_stay_in_range_for_random_distributions() {
    // Given: a seeded generator of non-negative balance lists
    let mut rng = fastrand::Rng::with_seed(7);

    for _ in 0..200 {
        let len = rng.usize(0..40);
        let values = (0..len)
            .map(|_| Decimal::new(rng.i64(0..10_000_000), rng.u32(0..6)))
            .collect::<Vec<_>>();

        // Then: Gini is within [0, 1] and Theil is non-negative
        let gini = gini(&values).expect("gini");
        assert!((0.0..=1.0).contains(&gini), "gini {gini} for {values:?}");
        let theil = theil_index(&values).expect("theil");
        assert!(theil >= 0.0, "theil {theil} for {values:?}");
    }
}

#[test]
fn statistics_are_idempotent_over_one_snapshot() {
    // Given: one snapshot
    let snapshot = snapshot(&["1200.5", "13", "0.000001", "87", "87", "4000"]);

    // When: statistics are derived twice
    let first = DerivedStatistics::from_snapshot(&snapshot, DEFAULT_NAKAMOTO_THRESHOLD)
        .expect("statistics");
    let second = DerivedStatistics::from_snapshot(&snapshot, DEFAULT_NAKAMOTO_THRESHOLD)
        .expect("statistics");

    // Then: the results are bit-identical
    assert_eq!(first, second);
    assert_eq!(first.gini.to_bits(), second.gini.to_bits());
    assert_eq!(first.theil.to_bits(), second.theil.to_bits());
}

#[test]
fn holder_order_does_not_change_statistics() {
    let forward = snapshot(&["5", "15", "80"]);
    let reversed = snapshot(&["80", "15", "5"]);

    let forward = DerivedStatistics::from_snapshot(&forward, DEFAULT_NAKAMOTO_THRESHOLD)
        .expect("statistics");
    let reversed = DerivedStatistics::from_snapshot(&reversed, DEFAULT_NAKAMOTO_THRESHOLD)
        .expect("statistics");

    assert_eq!(forward.gini, reversed.gini);
    assert_eq!(forward.nakamoto, reversed.nakamoto);
    assert_eq!(forward.median_balance, reversed.median_balance);
    assert_eq!(forward.top10_share, reversed.top10_share);
    assert!((forward.theil - reversed.theil).abs() < 1e-12);
}
