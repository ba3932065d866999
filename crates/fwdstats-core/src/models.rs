use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single forwarded payment, in satoshi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Amount sent on the outgoing channel.
    pub amount_out: u64,
    /// Routing fee collected for the forward.
    pub fee: u64,
}

impl Event {
    pub fn new(amount_out: u64, fee: u64) -> Self {
        Self { amount_out, fee }
    }

    /// Build an event from milli-satoshi values, truncating to whole satoshi.
    pub fn from_msat(amount_out_msat: u64, fee_msat: u64) -> Self {
        Self {
            amount_out: amount_out_msat / 1000,
            fee: fee_msat / 1000,
        }
    }
}

/// Half-open Unix-time window `[start_ts, end_ts)` covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// The local calendar day this window covers.
    pub date: NaiveDate,
    /// First second of the day (inclusive).
    pub start_ts: i64,
    /// First second of the following day (exclusive).
    pub end_ts: i64,
}

/// Forwarding statistics for one calendar day.
///
/// Field names double as the column names of the persisted CSV series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub tx_count: u64,
    pub total_forwarded: u64,
    pub fees_earned: u64,
    /// Mean of the per-event fee rates, truncated.
    pub avg_ppm: u64,
    /// Median forward amount.
    pub p50: u64,
    /// 95th percentile forward amount.
    pub p95: u64,
    pub max_forwarded: u64,
    pub max_fee: u64,
}

impl DailyStat {
    /// A day without activity: every numeric field is zero.
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            tx_count: 0,
            total_forwarded: 0,
            fees_earned: 0,
            avg_ppm: 0,
            p50: 0,
            p95: 0,
            max_forwarded: 0,
            max_fee: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero(self.date)
    }

    /// Fee rate of the day totals in ppm, `None` when nothing was forwarded.
    pub fn fee_rate_ppm(&self) -> Option<f64> {
        if self.total_forwarded == 0 {
            return None;
        }
        Some(self.fees_earned as f64 / self.total_forwarded as f64 * 1_000_000.0)
    }
}

/// Calendar month grouping key. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Totals for one calendar month of the daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStat {
    pub month_key: MonthKey,
    pub total_forwarded: u64,
    pub total_fees: u64,
    /// Fee rate of the month totals, truncated; 0 for an idle month.
    pub avg_ppm: u64,
}

/// Whole-range totals derived from the monthly roll-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub total_forwarded: u64,
    pub total_fees: u64,
    /// Mean monthly forwarded amount over the months present in the series.
    pub avg_forwarded_per_month: f64,
    /// Fee rate of the overall totals, truncated; 0 when nothing was forwarded.
    pub avg_ppm_overall: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_event_from_msat_truncates() {
        let e = Event::from_msat(1_234_999, 1_999);
        assert_eq!(e, Event::new(1_234, 1));
    }

    #[test]
    fn test_zero_record_is_zero() {
        let stat = DailyStat::zero(date(2024, 3, 1));
        assert!(stat.is_zero());
        assert_eq!(stat.tx_count, 0);
        assert_eq!(stat.fee_rate_ppm(), None);
    }

    #[test]
    fn test_fee_rate_ppm_of_day_totals() {
        let stat = DailyStat {
            total_forwarded: 2_000_000,
            fees_earned: 500,
            tx_count: 3,
            ..DailyStat::zero(date(2024, 3, 1))
        };
        assert!(!stat.is_zero());
        let ppm = stat.fee_rate_ppm().unwrap();
        assert!((ppm - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_month_key_ordering_is_chronological() {
        let dec = MonthKey::from_date(date(2023, 12, 31));
        let jan = MonthKey::from_date(date(2024, 1, 1));
        let feb = MonthKey::from_date(date(2024, 2, 10));
        assert!(dec < jan);
        assert!(jan < feb);
        assert_eq!(jan.to_string(), "2024-01");
        assert_eq!(dec.to_string(), "2023-12");
    }

    #[test]
    fn test_daily_stat_serializes_date_as_iso() {
        let stat = DailyStat::zero(date(2024, 1, 5));
        let json = serde_json::to_value(stat).unwrap();
        assert_eq!(json["date"], "2024-01-05");
    }
}
