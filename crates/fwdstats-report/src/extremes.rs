//! Extremal days of a daily series.
//!
//! Every selection keeps the earliest day among equal values: a later day
//! only replaces the current best when it is strictly greater.

use std::cmp::Ordering;

use chrono::NaiveDate;
use fwdstats_core::error::{FwdStatsError, Result};
use fwdstats_core::formatting::sats_to_btc;
use fwdstats_core::models::DailyStat;
use fwdstats_data::series::DailySeries;
use serde::Serialize;

/// A day together with the value it was selected for, in satoshi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayExtreme {
    pub date: NaiveDate,
    pub value: u64,
}

impl DayExtreme {
    pub fn btc(&self) -> f64 {
        sats_to_btc(self.value)
    }
}

/// The day with the highest fee-to-volume ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatioExtreme {
    pub date: NaiveDate,
    pub fees: u64,
    pub forwarded: u64,
}

impl RatioExtreme {
    /// Fee rate in ppm. `forwarded` is never zero for a selected day.
    pub fn ppm(&self) -> f64 {
        self.fees as f64 / self.forwarded as f64 * 1_000_000.0
    }
}

/// The five extremal days reported in the year-in-review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extremes {
    pub highest_forwarding_day: DayExtreme,
    pub highest_fees_day: DayExtreme,
    pub highest_ppm_day: RatioExtreme,
    pub largest_single_forward: DayExtreme,
    pub largest_single_fee: DayExtreme,
}

impl Extremes {
    /// Select all five extremes.
    ///
    /// Fails with [`FwdStatsError::InsufficientData`] when the series is
    /// empty or no day forwarded anything, since the fee ratio is undefined
    /// on every day in that case.
    pub fn find(series: &DailySeries) -> Result<Self> {
        let days = series.days();
        let pick = |key: fn(&DailyStat) -> u64, metric: &str| -> Result<DayExtreme> {
            max_earliest(days, |a, b| key(a).cmp(&key(b)))
                .map(|d| DayExtreme {
                    date: d.date,
                    value: key(d),
                })
                .ok_or_else(|| FwdStatsError::InsufficientData(metric.to_string()))
        };

        let highest_forwarding_day = pick(|d| d.total_forwarded, "highest forwarding day")?;
        let highest_fees_day = pick(|d| d.fees_earned, "highest fees day")?;
        let largest_single_forward = pick(|d| d.max_forwarded, "largest single forward")?;
        let largest_single_fee = pick(|d| d.max_fee, "largest single fee")?;

        let eligible: Vec<DailyStat> = days
            .iter()
            .filter(|d| d.total_forwarded > 0)
            .copied()
            .collect();
        let highest_ppm_day = max_earliest(&eligible, compare_fee_ratio)
            .map(|d| RatioExtreme {
                date: d.date,
                fees: d.fees_earned,
                forwarded: d.total_forwarded,
            })
            .ok_or_else(|| {
                FwdStatsError::InsufficientData(
                    "highest avg PPM day (no day forwarded any volume)".to_string(),
                )
            })?;

        Ok(Self {
            highest_forwarding_day,
            highest_fees_day,
            highest_ppm_day,
            largest_single_forward,
            largest_single_fee,
        })
    }
}

/// First day holding the maximum under `cmp`.
fn max_earliest<F>(days: &[DailyStat], cmp: F) -> Option<&DailyStat>
where
    F: Fn(&DailyStat, &DailyStat) -> Ordering,
{
    let mut best: Option<&DailyStat> = None;
    for day in days {
        match best {
            Some(current) if cmp(day, current) != Ordering::Greater => {}
            _ => best = Some(day),
        }
    }
    best
}

/// Exact comparison of `fees / forwarded` by cross-multiplication.
fn compare_fee_ratio(a: &DailyStat, b: &DailyStat) -> Ordering {
    let lhs = u128::from(a.fees_earned) * u128::from(b.total_forwarded);
    let rhs = u128::from(b.fees_earned) * u128::from(a.total_forwarded);
    lhs.cmp(&rhs)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(d: NaiveDate, forwarded: u64, fees: u64, max_fwd: u64, max_fee: u64) -> DailyStat {
        DailyStat {
            tx_count: u64::from(forwarded > 0),
            total_forwarded: forwarded,
            fees_earned: fees,
            max_forwarded: max_fwd,
            max_fee,
            ..DailyStat::zero(d)
        }
    }

    fn series(days: Vec<DailyStat>) -> DailySeries {
        DailySeries::new(days).unwrap()
    }

    #[test]
    fn test_picks_each_metric_independently() {
        let s = series(vec![
            day(date(2024, 1, 1), 1_500, 3, 1_000, 2),
            day(date(2024, 1, 2), 0, 0, 0, 0),
            day(date(2024, 1, 3), 1_000, 5, 400, 4),
            day(date(2024, 1, 4), 2_000, 1, 2_000, 1),
        ]);
        let x = Extremes::find(&s).unwrap();

        assert_eq!(x.highest_forwarding_day.date, date(2024, 1, 4));
        assert_eq!(x.highest_forwarding_day.value, 2_000);
        assert_eq!(x.highest_fees_day.date, date(2024, 1, 3));
        assert_eq!(x.highest_ppm_day.date, date(2024, 1, 3));
        assert!((x.highest_ppm_day.ppm() - 5_000.0).abs() < 1e-9);
        assert_eq!(x.largest_single_forward.date, date(2024, 1, 4));
        assert_eq!(x.largest_single_fee.date, date(2024, 1, 3));
    }

    #[test]
    fn test_ties_resolve_to_earliest_date() {
        let s = series(vec![
            day(date(2024, 2, 1), 1_000, 10, 500, 5),
            day(date(2024, 2, 2), 1_000, 10, 500, 5),
            day(date(2024, 2, 3), 500, 5, 500, 5),
        ]);
        let x = Extremes::find(&s).unwrap();

        assert_eq!(x.highest_forwarding_day.date, date(2024, 2, 1));
        assert_eq!(x.highest_fees_day.date, date(2024, 2, 1));
        // Same 10_000 ppm on every day.
        assert_eq!(x.highest_ppm_day.date, date(2024, 2, 1));
        assert_eq!(x.largest_single_forward.date, date(2024, 2, 1));
        assert_eq!(x.largest_single_fee.date, date(2024, 2, 1));
    }

    #[test]
    fn test_ratio_ignores_idle_days() {
        // An idle day with fees would be an infinite ratio; it is excluded.
        let s = series(vec![
            day(date(2024, 3, 1), 0, 7, 0, 7),
            day(date(2024, 3, 2), 10_000, 1, 10_000, 1),
        ]);
        let x = Extremes::find(&s).unwrap();
        assert_eq!(x.highest_ppm_day.date, date(2024, 3, 2));
        assert_eq!(x.highest_fees_day.date, date(2024, 3, 1));
    }

    #[test]
    fn test_ratio_compares_exactly() {
        // 333_333 ppm against 333_333.3 ppm.
        let s = series(vec![
            day(date(2024, 4, 1), 1_000_000, 333_333, 0, 0),
            day(date(2024, 4, 2), 3, 1, 0, 0),
        ]);
        let x = Extremes::find(&s).unwrap();
        assert_eq!(x.highest_ppm_day.date, date(2024, 4, 2));
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let err = Extremes::find(&DailySeries::default()).unwrap_err();
        assert!(matches!(err, FwdStatsError::InsufficientData(_)));
    }

    #[test]
    fn test_all_zero_series_is_insufficient() {
        let s = series(vec![
            DailyStat::zero(date(2024, 5, 1)),
            DailyStat::zero(date(2024, 5, 2)),
        ]);
        let err = Extremes::find(&s).unwrap_err();
        assert!(err.to_string().contains("highest avg PPM day"));
    }

    #[test]
    fn test_day_extreme_btc() {
        let e = DayExtreme {
            date: date(2024, 1, 1),
            value: 150_000_000,
        };
        assert!((e.btc() - 1.5).abs() < f64::EPSILON);
    }
}
