//! Forwarding aggregation over daily and monthly time windows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fwdstats_core::models::{DailyStat, Event, MonthKey, MonthlyStat, OverallSummary};
use fwdstats_core::stats::{event_ppm, mean, percentile_u64, ratio_ppm};

use crate::series::DailySeries;

// ── DailyAggregator ───────────────────────────────────────────────────────────

/// Stateless reducer from one day's events to a [`DailyStat`].
pub struct DailyAggregator;

impl DailyAggregator {
    /// Aggregate the events of `date`. An empty slice yields the zero record.
    pub fn aggregate(date: NaiveDate, events: &[Event]) -> DailyStat {
        if events.is_empty() {
            return DailyStat::zero(date);
        }

        let mut amounts: Vec<u64> = events.iter().map(|e| e.amount_out).collect();
        amounts.sort_unstable();

        let ppms: Vec<f64> = events
            .iter()
            .map(|e| event_ppm(e.amount_out, e.fee))
            .collect();

        DailyStat {
            date,
            tx_count: events.len() as u64,
            total_forwarded: events.iter().map(|e| e.amount_out).sum(),
            fees_earned: events.iter().map(|e| e.fee).sum(),
            avg_ppm: mean(&ppms).trunc() as u64,
            p50: percentile_u64(&amounts, 50.0),
            p95: percentile_u64(&amounts, 95.0),
            max_forwarded: amounts.last().copied().unwrap_or(0),
            max_fee: events.iter().map(|e| e.fee).max().unwrap_or(0),
        }
    }
}

// ── MonthlyAggregator ─────────────────────────────────────────────────────────

/// Monthly roll-up of a daily series plus whole-range totals.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRollup {
    /// One entry per month present, chronological.
    pub months: Vec<MonthlyStat>,
    pub overall: OverallSummary,
}

#[derive(Default)]
struct MonthTotals {
    forwarded: u64,
    fees: u64,
}

/// Stateless helper that groups daily rows by calendar month.
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    /// Roll `series` up into months and overall totals.
    pub fn aggregate(series: &DailySeries) -> MonthlyRollup {
        Self::aggregate_days(series.days())
    }

    /// Roll up arbitrary daily rows; months come out in chronological order.
    pub fn aggregate_days(days: &[DailyStat]) -> MonthlyRollup {
        let mut map: BTreeMap<MonthKey, MonthTotals> = BTreeMap::new();
        for day in days {
            let totals = map.entry(MonthKey::from_date(day.date)).or_default();
            totals.forwarded += day.total_forwarded;
            totals.fees += day.fees_earned;
        }

        let months: Vec<MonthlyStat> = map
            .into_iter()
            .map(|(month_key, t)| MonthlyStat {
                month_key,
                total_forwarded: t.forwarded,
                total_fees: t.fees,
                avg_ppm: ratio_ppm(t.fees, t.forwarded),
            })
            .collect();

        let overall = Self::calculate_overall(&months);
        MonthlyRollup { months, overall }
    }

    /// Whole-range totals from the monthly rows.
    pub fn calculate_overall(months: &[MonthlyStat]) -> OverallSummary {
        let total_forwarded: u64 = months.iter().map(|m| m.total_forwarded).sum();
        let total_fees: u64 = months.iter().map(|m| m.total_fees).sum();
        let monthly_forwarded: Vec<f64> =
            months.iter().map(|m| m.total_forwarded as f64).collect();

        OverallSummary {
            total_forwarded,
            total_fees,
            avg_forwarded_per_month: mean(&monthly_forwarded),
            avg_ppm_overall: ratio_ppm(total_fees, total_forwarded),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
