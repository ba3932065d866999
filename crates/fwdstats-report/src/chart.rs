//! Text bar charts of the daily series.
//!
//! Two files are produced: forwarded volume in BTC with a trailing moving
//! average, and fees in satoshi with the day's fee rate.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use fwdstats_core::error::Result;
use fwdstats_core::formatting::{group_thousands, sats_to_btc};
use fwdstats_data::series::DailySeries;

pub const FORWARDED_CHART: &str = "daily_forwarded_btc.txt";
pub const FEES_CHART: &str = "daily_fees_sats.txt";

/// Trailing window of the forwarded-volume moving average, in days.
pub const MOVING_AVERAGE_DAYS: usize = 5;

/// Width of a full-scale bar, in characters.
const BAR_WIDTH: usize = 50;
const BAR_CHAR: char = '#';

/// One day of chart data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub forwarded_btc: f64,
    /// Trailing [`MOVING_AVERAGE_DAYS`]-day mean of `forwarded_btc`.
    pub forwarded_ma: f64,
    pub fees: u64,
    /// Fee rate of the day totals; 0 when nothing was forwarded.
    pub ppm: f64,
}

/// Trailing mean over `window` values. The first entries average over the
/// values available so far.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        out.push(sum / (i + 1).min(window) as f64);
    }
    out
}

/// Chart data for every day of `series`.
pub fn chart_points(series: &DailySeries) -> Vec<ChartPoint> {
    let forwarded: Vec<f64> = series
        .iter()
        .map(|d| sats_to_btc(d.total_forwarded))
        .collect();
    let averages = moving_average(&forwarded, MOVING_AVERAGE_DAYS);

    series
        .iter()
        .zip(forwarded.iter().zip(averages))
        .map(|(day, (&forwarded_btc, forwarded_ma))| ChartPoint {
            date: day.date,
            forwarded_btc,
            forwarded_ma,
            fees: day.fees_earned,
            ppm: day.fee_rate_ppm().unwrap_or(0.0),
        })
        .collect()
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    BAR_CHAR.to_string().repeat(len.clamp(1, BAR_WIDTH))
}

/// Forwarded BTC per day with the moving average column.
pub fn render_forwarded_chart(points: &[ChartPoint]) -> String {
    let max = points.iter().map(|p| p.forwarded_btc).fold(0.0, f64::max);
    let mut out = String::new();
    let _ = writeln!(out, "Daily Forwarded BTC ({MOVING_AVERAGE_DAYS}-day MA)");
    let _ = writeln!(
        out,
        "{:<10}  {:>12}  {:>12}  bar",
        "date", "btc", "ma"
    );
    for p in points {
        let _ = writeln!(
            out,
            "{:<10}  {:>12.6}  {:>12.6}  {}",
            p.date,
            p.forwarded_btc,
            p.forwarded_ma,
            bar(p.forwarded_btc, max)
        );
    }
    out
}

/// Fees in satoshi per day with the fee rate column.
pub fn render_fees_chart(points: &[ChartPoint]) -> String {
    let max = points.iter().map(|p| p.fees).max().unwrap_or(0) as f64;
    let mut out = String::new();
    let _ = writeln!(out, "Daily Fees (sats) & PPM");
    let _ = writeln!(out, "{:<10}  {:>12}  {:>10}  bar", "date", "fees_sat", "ppm");
    for p in points {
        let _ = writeln!(
            out,
            "{:<10}  {:>12}  {:>10.1}  {}",
            p.date,
            group_thousands(p.fees),
            p.ppm,
            bar(p.fees as f64, max)
        );
    }
    out
}

/// Writes both charts for a series.
pub struct ChartRenderer;

impl ChartRenderer {
    /// Render both charts into `output_dir`, returning the written paths.
    pub fn write_all(series: &DailySeries, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let points = chart_points(series);
        let charts = [
            (FORWARDED_CHART, render_forwarded_chart(&points)),
            (FEES_CHART, render_fees_chart(&points)),
        ];

        let mut written = Vec::with_capacity(charts.len());
        for (name, body) in charts {
            let path = output_dir.join(name);
            fs::write(&path, body)?;
            tracing::info!(path = %path.display(), "chart saved");
            written.push(path);
        }
        Ok(written)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
