//! Year-in-review text report.
//!
//! The monthly table is laid out like a small data frame print: every column
//! is right-aligned to its widest cell, followed by a divider the width of
//! the table and a `TOTAL` row.

use std::fs;
use std::path::{Path, PathBuf};

use fwdstats_core::error::{FwdStatsError, Result};
use fwdstats_core::formatting::{format_btc, SATS_PER_BTC};
use fwdstats_core::models::{MonthlyStat, OverallSummary};
use fwdstats_data::aggregator::{MonthlyAggregator, MonthlyRollup};
use fwdstats_data::series::DailySeries;

use crate::extremes::Extremes;

/// File the report is saved to inside the output directory.
pub const REPORT_FILE: &str = "year_in_review.txt";

const HEADER: &str = "===== Year-in-Review Summary =====";
const COLUMNS: [&str; 4] = ["month", "total_forwarded_btc", "total_fees_btc", "avg_ppm"];
const COLUMN_GAP: &str = "  ";

/// Extremes section of the report: either the five days, or the reason
/// they could not be determined.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtremesSection {
    Found(Extremes),
    Insufficient(String),
}

/// Everything shown in the year-in-review.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub extremes: ExtremesSection,
    pub months: Vec<MonthlyStat>,
    pub overall: OverallSummary,
}

/// Builds and renders [`SummaryReport`]s.
pub struct SummaryReporter;

impl SummaryReporter {
    /// Roll `series` up and select its extremes.
    ///
    /// Insufficient data for the extremes is not an error here: it is carried
    /// in the report so the monthly totals can still be shown.
    pub fn build(series: &DailySeries) -> Result<SummaryReport> {
        let MonthlyRollup { months, overall } = MonthlyAggregator::aggregate(series);
        let extremes = match Extremes::find(series) {
            Ok(found) => ExtremesSection::Found(found),
            Err(FwdStatsError::InsufficientData(what)) => {
                tracing::warn!(metric = %what, "not enough activity for year-in-review extremes");
                ExtremesSection::Insufficient(what)
            }
            Err(e) => return Err(e),
        };
        Ok(SummaryReport {
            extremes,
            months,
            overall,
        })
    }

    /// Save the rendered report to [`REPORT_FILE`] in `output_dir`.
    pub fn save(report: &SummaryReport, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(REPORT_FILE);
        fs::write(&path, report.render())?;
        tracing::info!(path = %path.display(), "year-in-review saved");
        Ok(path)
    }
}

impl SummaryReport {
    /// Full report text, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        out.push_str(&self.render_extremes());
        out.push('\n');
        out.push_str("Monthly Totals (with overall totals/averages):\n");
        out.push_str(&self.render_monthly_table());
        out.push('\n');
        out.push_str(&self.render_overall());
        out
    }

    fn render_extremes(&self) -> String {
        match &self.extremes {
            ExtremesSection::Found(x) => {
                let f = &x.highest_forwarding_day;
                let fees = &x.highest_fees_day;
                let ppm = &x.highest_ppm_day;
                let fwd = &x.largest_single_forward;
                let fee = &x.largest_single_fee;
                format!(
                    "Highest forwarding day: {} → {} BTC\n\
                     Highest fees day: {} → {} BTC\n\
                     Highest avg PPM day: {} → {:.1} ppm\n\
                     Largest single forward: {} BTC on {}\n\
                     Largest single fee: {} BTC on {}\n",
                    f.date,
                    format_btc(f.value, 4),
                    fees.date,
                    format_btc(fees.value, 4),
                    ppm.date,
                    ppm.ppm(),
                    format_btc(fwd.value, 4),
                    fwd.date,
                    format_btc(fee.value, 4),
                    fee.date,
                )
            }
            ExtremesSection::Insufficient(what) => {
                format!("Insufficient data to compute {what}\n")
            }
        }
    }

    fn render_monthly_table(&self) -> String {
        let rows: Vec<[String; 4]> = self
            .months
            .iter()
            .map(|m| {
                [
                    m.month_key.to_string(),
                    format_btc(m.total_forwarded, 6),
                    format_btc(m.total_fees, 6),
                    m.avg_ppm.to_string(),
                ]
            })
            .collect();
        let total = [
            "TOTAL".to_string(),
            format_btc(self.overall.total_forwarded, 6),
            format_btc(self.overall.total_fees, 6),
            self.overall.avg_ppm_overall.to_string(),
        ];

        let mut widths = COLUMNS.map(str::len);
        for row in rows.iter().chain(std::iter::once(&total)) {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.len());
            }
        }

        let line = |cells: &[&str]| -> String {
            cells
                .iter()
                .zip(widths)
                .map(|(cell, w)| format!("{cell:>w$}"))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP)
        };
        let header = line(&COLUMNS);
        let table_width = header.len();

        let mut out = header;
        out.push('\n');
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            out.push_str(&line(&cells));
            out.push('\n');
        }
        out.push_str(&"-".repeat(table_width));
        out.push('\n');
        let cells: Vec<&str> = total.iter().map(String::as_str).collect();
        out.push_str(&line(&cells));
        out.push('\n');
        out
    }

    fn render_overall(&self) -> String {
        format!(
            "Overall Totals & Averages:\n \
             - Total BTC forwarded: {}\n \
             - Average BTC forwarded per month: {:.6}\n \
             - Overall average PPM: {}\n",
            format_btc(self.overall.total_forwarded, 6),
            self.overall.avg_forwarded_per_month / SATS_PER_BTC,
            self.overall.avg_ppm_overall,
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
