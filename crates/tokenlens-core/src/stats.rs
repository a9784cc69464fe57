//! Holder-distribution and change statistics.
//!
//! Every function here is pure: the same balances always produce bit-identical
//! output. Defined edge cases (empty input, zero supply, a single holder)
//! return their zero/absent value; negative balances are a
//! [`ComputationError`] and are never clamped.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ComputationError, HolderSnapshot};

/// Share of supply the Nakamoto coefficient must exceed by default (51%).
pub const DEFAULT_NAKAMOTO_THRESHOLD: Decimal = Decimal::from_parts(51, 0, 0, false, 2);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Concentration statistics derived from one holder snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedStatistics {
    pub holder_count: usize,
    pub unique_holders: usize,
    pub total_balance: Decimal,
    pub mean_balance: Option<Decimal>,
    pub median_balance: Option<Decimal>,
    pub gini: f64,
    pub nakamoto: usize,
    pub nakamoto_threshold: Decimal,
    pub theil: f64,
    /// Largest holder's share of the snapshot total, in `[0, 1]`.
    pub top1_share: Option<Decimal>,
    /// Ten largest holders' share of the snapshot total, in `[0, 1]`.
    pub top10_share: Option<Decimal>,
}

impl DerivedStatistics {
    pub fn from_snapshot(
        snapshot: &HolderSnapshot,
        nakamoto_threshold: Decimal,
    ) -> Result<Self, ComputationError> {
        let negative = snapshot
            .holders()
            .iter()
            .find(|holder| is_negative(holder.balance));
        if let Some(holder) = negative {
            return Err(ComputationError::NegativeBalance {
                address: holder.address.clone(),
                balance: holder.balance.to_string(),
            });
        }

        let balances = snapshot.balances();
        let distribution = Distribution::from_non_negative(&balances)?;
        Ok(Self {
            holder_count: balances.len(),
            unique_holders: snapshot.unique_addresses(),
            total_balance: distribution.total,
            mean_balance: distribution.mean()?,
            median_balance: median_of_sorted(&distribution.descending)?,
            gini: distribution.gini()?,
            nakamoto: distribution.nakamoto(nakamoto_threshold)?,
            nakamoto_threshold,
            theil: distribution.theil()?,
            top1_share: distribution.top_share(1)?,
            top10_share: distribution.top_share(10)?,
        })
    }
}

/// Non-negative balances sorted largest first, with their checked total.
struct Distribution {
    descending: Vec<Decimal>,
    total: Decimal,
}

impl Distribution {
    fn new(balances: &[Decimal]) -> Result<Self, ComputationError> {
        if let Some((index, balance)) = balances
            .iter()
            .enumerate()
            .find(|(_, balance)| is_negative(**balance))
        {
            return Err(ComputationError::NegativeBalance {
                address: format!("#{index}"),
                balance: balance.to_string(),
            });
        }
        Self::from_non_negative(balances)
    }

    fn from_non_negative(balances: &[Decimal]) -> Result<Self, ComputationError> {
        let mut descending = balances.to_vec();
        descending.sort_by(|left, right| right.cmp(left));
        let total = sum(&descending)?;
        Ok(Self { descending, total })
    }

    fn len(&self) -> usize {
        self.descending.len()
    }

    fn mean(&self) -> Result<Option<Decimal>, ComputationError> {
        if self.descending.is_empty() {
            return Ok(None);
        }
        self.total
            .checked_div(Decimal::from(self.len()))
            .map(Some)
            .ok_or(ComputationError::Overflow { operation: "mean" })
    }

    fn gini(&self) -> Result<f64, ComputationError> {
        let n = self.len();
        if n < 2 || self.total.is_zero() {
            return Ok(0.0);
        }

        let n_dec = Decimal::from(n);
        let mut weighted = Decimal::ZERO;
        // Ascending rank i pairs with the descending slice read back to front.
        for (index, balance) in self.descending.iter().rev().enumerate() {
            let rank = Decimal::from(index + 1);
            let weight = (Decimal::TWO * rank) - n_dec - Decimal::ONE;
            let term = weight
                .checked_mul(*balance)
                .ok_or(ComputationError::Overflow { operation: "gini" })?;
            weighted = weighted
                .checked_add(term)
                .ok_or(ComputationError::Overflow { operation: "gini" })?;
        }

        let denominator = (n_dec - Decimal::ONE)
            .checked_mul(self.total)
            .ok_or(ComputationError::Overflow { operation: "gini" })?;
        let ratio = weighted
            .checked_div(denominator)
            .ok_or(ComputationError::Overflow { operation: "gini" })?;

        to_f64(ratio, "gini").map(|value| value.clamp(0.0, 1.0))
    }

    fn nakamoto(&self, threshold: Decimal) -> Result<usize, ComputationError> {
        if threshold <= Decimal::ZERO || threshold >= Decimal::ONE {
            return Err(ComputationError::InvalidThreshold {
                value: threshold.to_string(),
            });
        }
        if self.total.is_zero() {
            return Ok(0);
        }

        let required = threshold
            .checked_mul(self.total)
            .ok_or(ComputationError::Overflow {
                operation: "nakamoto",
            })?;

        let mut cumulative = Decimal::ZERO;
        for (index, balance) in self.descending.iter().enumerate() {
            cumulative += *balance;
            if cumulative > required {
                return Ok(index + 1);
            }
        }

        Ok(self.len())
    }

    fn theil(&self) -> Result<f64, ComputationError> {
        let Some(mean) = self.mean()? else {
            return Ok(0.0);
        };
        if mean.is_zero() {
            return Ok(0.0);
        }

        let mut accumulated = 0.0_f64;
        for balance in &self.descending {
            if balance.is_zero() {
                continue;
            }
            let ratio = balance
                .checked_div(mean)
                .ok_or(ComputationError::Overflow { operation: "theil" })?;
            if ratio == Decimal::ONE {
                continue;
            }
            let ratio = to_f64(ratio, "theil")?;
            accumulated += ratio * ratio.ln();
        }

        Ok((accumulated / self.len() as f64).max(0.0))
    }

    fn top_share(&self, count: usize) -> Result<Option<Decimal>, ComputationError> {
        if self.descending.is_empty() || self.total.is_zero() || count == 0 {
            return Ok(None);
        }

        let top = sum(&self.descending[..count.min(self.len())])?;
        top.checked_div(self.total)
            .map(Some)
            .ok_or(ComputationError::Overflow {
                operation: "top share",
            })
    }
}

/// Sample-corrected Gini coefficient in `[0, 1]`.
///
/// `Σ|xi − xj| / (2·n·(n−1)·mean)`, evaluated over the ascending sort as
/// `Σ (2i − n − 1)·x(i) / ((n − 1)·Σx)`. Empty input, a single holder or a
/// zero total yield `0`.
pub fn gini(balances: &[Decimal]) -> Result<f64, ComputationError> {
    Distribution::new(balances)?.gini()
}

/// Smallest number of top holders whose combined balance exceeds
/// `threshold` of the total. `0` for empty input or zero supply.
pub fn nakamoto_coefficient(
    balances: &[Decimal],
    threshold: Decimal,
) -> Result<usize, ComputationError> {
    Distribution::new(balances)?.nakamoto(threshold)
}

/// Theil T index: `(1/n)·Σ (xi/μ)·ln(xi/μ)`, with `0·ln 0 = 0`.
///
/// `0` for empty input, zero supply or all-equal balances.
pub fn theil_index(balances: &[Decimal]) -> Result<f64, ComputationError> {
    Distribution::new(balances)?.theil()
}

pub fn sum(balances: &[Decimal]) -> Result<Decimal, ComputationError> {
    balances.iter().try_fold(Decimal::ZERO, |acc, balance| {
        acc.checked_add(*balance)
            .ok_or(ComputationError::Overflow { operation: "sum" })
    })
}

/// Arithmetic mean; absent for empty input.
pub fn mean(balances: &[Decimal]) -> Result<Option<Decimal>, ComputationError> {
    if balances.is_empty() {
        return Ok(None);
    }
    sum(balances)?
        .checked_div(Decimal::from(balances.len()))
        .map(Some)
        .ok_or(ComputationError::Overflow { operation: "mean" })
}

/// Median; absent for empty input. Even-length input averages the two middle
/// values.
pub fn median(balances: &[Decimal]) -> Result<Option<Decimal>, ComputationError> {
    let mut sorted = balances.to_vec();
    sorted.sort();
    median_of_sorted(&sorted)
}

/// Median of a slice sorted in either direction.
fn median_of_sorted(sorted: &[Decimal]) -> Result<Option<Decimal>, ComputationError> {
    if sorted.is_empty() {
        return Ok(None);
    }

    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        return Ok(Some(sorted[middle]));
    }

    let lower = sorted[middle - 1].min(sorted[middle]) / Decimal::TWO;
    let upper = sorted[middle - 1].max(sorted[middle]) / Decimal::TWO;
    lower
        .checked_add(upper)
        .map(Some)
        .ok_or(ComputationError::Overflow { operation: "median" })
}

/// `(new − old) / old · 100`.
///
/// Absent when `old` is zero, since the change is undefined rather than zero,
/// and when the result is not representable as a decimal.
pub fn percent_change(old: Decimal, new: Decimal) -> Option<Decimal> {
    if old.is_zero() {
        return None;
    }
    new.checked_sub(old)?
        .checked_div(old)?
        .checked_mul(HUNDRED)
}

/// Combined share of the `count` largest balances; absent for empty input or
/// zero supply.
pub fn top_share(balances: &[Decimal], count: usize) -> Result<Option<Decimal>, ComputationError> {
    Distribution::new(balances)?.top_share(count)
}

fn is_negative(balance: Decimal) -> bool {
    balance.is_sign_negative() && !balance.is_zero()
}

fn to_f64(value: Decimal, operation: &'static str) -> Result<f64, ComputationError> {
    value
        .to_f64()
        .ok_or(ComputationError::Overflow { operation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CalendarDate, HolderRecord};

    fn dec(values: &[i64]) -> Vec<Decimal> {
        values.iter().copied().map(Decimal::from).collect()
    }

    #[test]
    fn equal_balances_have_no_inequality() {
        let balances = dec(&[25, 25, 25, 25]);
        assert_eq!(gini(&balances).expect("gini"), 0.0);
        assert_eq!(theil_index(&balances).expect("theil"), 0.0);
    }

    #[test]
    fn skewed_distribution_matches_reference_values() {
        let balances = dec(&[10, 10, 10, 10, 60]);
        assert!((gini(&balances).expect("gini") - 0.5).abs() < 1e-12);
        assert_eq!(
            nakamoto_coefficient(&balances, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto"),
            1
        );
        // (1/5)·(4·0.5·ln 0.5 + 3·ln 3) ≈ 0.381
        let theil = theil_index(&balances).expect("theil");
        assert!((theil - 0.381_908_5).abs() < 1e-6, "theil = {theil}");
    }

    #[test]
    fn single_owner_among_empty_wallets_is_maximal() {
        let balances = dec(&[0, 0, 0, 100]);
        assert!((gini(&balances).expect("gini") - 1.0).abs() < 1e-12);
        assert_eq!(
            nakamoto_coefficient(&balances, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto"),
            1
        );
    }

    #[test]
    fn nakamoto_counts_holders_until_threshold_is_exceeded() {
        let balances = dec(&[30, 21, 20, 15, 14]);
        // 30 → 0.30, 51 → 0.51 (not > 0.51), 71 → 0.71
        assert_eq!(
            nakamoto_coefficient(&balances, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto"),
            3
        );
    }

    #[test]
    fn empty_input_returns_defined_values() {
        let empty: Vec<Decimal> = Vec::new();
        assert_eq!(gini(&empty).expect("gini"), 0.0);
        assert_eq!(theil_index(&empty).expect("theil"), 0.0);
        assert_eq!(
            nakamoto_coefficient(&empty, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto"),
            0
        );
        assert_eq!(sum(&empty).expect("sum"), Decimal::ZERO);
        assert_eq!(mean(&empty).expect("mean"), None);
        assert_eq!(median(&empty).expect("median"), None);
        assert_eq!(top_share(&empty, 10).expect("share"), None);
    }

    #[test]
    fn zero_supply_is_not_an_error() {
        let zeros = dec(&[0, 0, 0]);
        assert_eq!(gini(&zeros).expect("gini"), 0.0);
        assert_eq!(
            nakamoto_coefficient(&zeros, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto"),
            0
        );
        assert_eq!(theil_index(&zeros).expect("theil"), 0.0);
    }

    #[test]
    fn negative_balance_is_a_computation_error() {
        let balances = dec(&[10, -1]);
        assert!(matches!(
            gini(&balances),
            Err(ComputationError::NegativeBalance { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = nakamoto_coefficient(&dec(&[1]), Decimal::ONE).expect_err("must fail");
        assert!(matches!(err, ComputationError::InvalidThreshold { .. }));
    }

    #[test]
    fn negative_balance_is_reported_by_position() {
        let err = nakamoto_coefficient(&dec(&[3, 2, -4]), DEFAULT_NAKAMOTO_THRESHOLD)
            .expect_err("must fail");
        assert_eq!(
            err,
            ComputationError::NegativeBalance {
                address: String::from("#2"),
                balance: String::from("-4"),
            }
        );
    }

    #[test]
    fn snapshot_statistics_agree_with_the_standalone_functions() {
        let date = CalendarDate::parse("2024-05-01").expect("date");
        let values = [7, 0, 19, 3, 3, 120, 41];
        let snapshot = HolderSnapshot::new(
            date,
            values
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    HolderRecord::new(format!("0x{index}"), Decimal::from(*value))
                })
                .collect(),
        );
        let balances = dec(&values);

        let statistics = DerivedStatistics::from_snapshot(&snapshot, DEFAULT_NAKAMOTO_THRESHOLD)
            .expect("stats");

        assert_eq!(statistics.gini.to_bits(), gini(&balances).expect("gini").to_bits());
        assert_eq!(
            statistics.theil.to_bits(),
            theil_index(&balances).expect("theil").to_bits()
        );
        assert_eq!(
            statistics.nakamoto,
            nakamoto_coefficient(&balances, DEFAULT_NAKAMOTO_THRESHOLD).expect("nakamoto")
        );
        assert_eq!(statistics.top10_share, top_share(&balances, 10).expect("share"));
        assert_eq!(statistics.mean_balance, mean(&balances).expect("mean"));
        assert_eq!(statistics.median_balance, median(&balances).expect("median"));
        assert_eq!(statistics.total_balance, Decimal::from(193));
    }

    #[test]
    fn median_averages_middle_pair() {
        assert_eq!(median(&dec(&[4, 1, 3, 2])).expect("median"), Some(Decimal::new(25, 1)));
        assert_eq!(median(&dec(&[5, 1, 3])).expect("median"), Some(Decimal::from(3)));
    }

    #[test]
    fn percent_change_from_zero_is_absent() {
        assert_eq!(percent_change(Decimal::ZERO, Decimal::from(42)), None);
        assert_eq!(percent_change(Decimal::ZERO, Decimal::ZERO), None);
        assert_eq!(
            percent_change(Decimal::from(80), Decimal::from(100)),
            Some(Decimal::from(25))
        );
        assert_eq!(
            percent_change(Decimal::from(100), Decimal::from(50)),
            Some(Decimal::from(-50))
        );
    }

    #[test]
    fn snapshot_statistics_report_offending_holder() {
        let date = CalendarDate::parse("2024-05-01").expect("date");
        let snapshot = HolderSnapshot::new(
            date,
            vec![
                HolderRecord::new("0xaaa", Decimal::from(5)),
                HolderRecord::new("0xbbb", Decimal::from(-5)),
            ],
        );
        let err = DerivedStatistics::from_snapshot(&snapshot, DEFAULT_NAKAMOTO_THRESHOLD)
            .expect_err("must fail");
        assert_eq!(
            err,
            ComputationError::NegativeBalance {
                address: String::from("0xbbb"),
                balance: String::from("-5"),
            }
        );
    }

    #[test]
    fn snapshot_statistics_are_idempotent() {
        let date = CalendarDate::parse("2024-05-01").expect("date");
        let snapshot = HolderSnapshot::new(
            date,
            vec![
                HolderRecord::new("0xaaa", Decimal::new(123_456_789, 4)),
                HolderRecord::new("0xbbb", Decimal::new(42, 0)),
                HolderRecord::new("0xccc", Decimal::new(7, 3)),
            ],
        );

        let first = DerivedStatistics::from_snapshot(&snapshot, DEFAULT_NAKAMOTO_THRESHOLD)
            .expect("stats");
        let second = DerivedStatistics::from_snapshot(&snapshot, DEFAULT_NAKAMOTO_THRESHOLD)
            .expect("stats");

        assert_eq!(first.gini.to_bits(), second.gini.to_bits());
        assert_eq!(first.theil.to_bits(), second.theil.to_bits());
        assert_eq!(first, second);
        assert_eq!(first.unique_holders, 3);
    }
}
