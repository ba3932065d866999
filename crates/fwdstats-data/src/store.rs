//! CSV persistence of the daily series and of failed fetches.
//!
//! The series file is written row by row and flushed after every row, so a
//! run interrupted between days leaves a valid, ascending prefix behind that
//! `--resume` can pick up. Failed days are appended to the failure log before
//! their zero row reaches the series file, so a resumed run never mistakes
//! such a row for a quiet day.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{Reader, Writer, WriterBuilder};
use fwdstats_core::error::{FwdStatsError, Result};
use fwdstats_core::models::DailyStat;
use fwdstats_core::time_utils::DateRange;
use tracing::{debug, info};

use crate::series::{DayFailure, SeriesSink};

/// File name of the persisted daily series.
pub const DAILY_CSV: &str = "daily_forwarding.csv";

/// File name of the failed-day log.
pub const FAILURES_CSV: &str = "fetch_failures.csv";

/// Column order of the persisted daily series.
pub const DAILY_HEADER: [&str; 9] = [
    "date",
    "tx_count",
    "total_forwarded",
    "fees_earned",
    "avg_ppm",
    "p50",
    "p95",
    "max_forwarded",
    "max_fee",
];

fn store_err(path: &Path, e: impl std::fmt::Display) -> FwdStatsError {
    FwdStatsError::Store {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

// ── CsvSeriesWriter ───────────────────────────────────────────────────────────

/// Incremental CSV writer for daily rows.
pub struct CsvSeriesWriter {
    path: PathBuf,
    writer: Writer<File>,
    rows: usize,
    last_date: Option<NaiveDate>,
}

impl CsvSeriesWriter {
    /// Create (or truncate) `path` and write the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| store_err(&path, e))?;
        writer
            .write_record(DAILY_HEADER)
            .map_err(|e| store_err(&path, e))?;
        writer.flush()?;
        info!("Writing {}", path.display());
        Ok(Self {
            path,
            writer,
            rows: 0,
            last_date: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }
}

impl SeriesSink for CsvSeriesWriter {
    fn write_day(&mut self, stat: &DailyStat) -> Result<()> {
        if self.last_date.is_some_and(|last| stat.date <= last) {
            return Err(store_err(
                &self.path,
                format!("row {} is not after the previous row", stat.date),
            ));
        }
        self.writer
            .serialize(stat)
            .map_err(|e| store_err(&self.path, e))?;
        self.writer.flush()?;
        self.rows += 1;
        self.last_date = Some(stat.date);
        Ok(())
    }
}

// ── FailureLogWriter ──────────────────────────────────────────────────────────

/// Appending CSV log of failed days, flushed after every entry.
///
/// The file is only created when the first failure arrives.
pub struct FailureLogWriter {
    path: PathBuf,
    writer: Option<Writer<File>>,
    recorded: usize,
}

impl FailureLogWriter {
    /// Prepare a log at `path`, removing one left by an earlier run.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "removed previous failure log");
        }
        Ok(Self {
            path,
            writer: None,
            recorded: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn recorded(&self) -> usize {
        self.recorded
    }

    pub fn record(&mut self, failure: &DayFailure) -> Result<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                info!("Logging failed days to {}", self.path.display());
                Writer::from_path(&self.path).map_err(|e| store_err(&self.path, e))?
            }
        };
        let writer = self.writer.insert(writer);
        writer
            .serialize(failure)
            .map_err(|e| store_err(&self.path, e))?;
        writer.flush()?;
        self.recorded += 1;
        Ok(())
    }
}

// ── OutputFiles ───────────────────────────────────────────────────────────────

/// Series file and failure log of one collection run.
pub struct OutputFiles {
    series: CsvSeriesWriter,
    failures: FailureLogWriter,
}

impl OutputFiles {
    /// Start both files in `output_dir`, replacing any earlier run's output.
    pub fn create(output_dir: &Path) -> Result<Self> {
        Ok(Self {
            failures: FailureLogWriter::create(output_dir.join(FAILURES_CSV))?,
            series: CsvSeriesWriter::create(output_dir.join(DAILY_CSV))?,
        })
    }

    pub fn series(&self) -> &CsvSeriesWriter {
        &self.series
    }

    pub fn failures(&self) -> &FailureLogWriter {
        &self.failures
    }
}

impl SeriesSink for OutputFiles {
    fn write_day(&mut self, stat: &DailyStat) -> Result<()> {
        self.series.write_day(stat)
    }

    fn record_failure(&mut self, failure: &DayFailure) -> Result<()> {
        self.failures.record(failure)
    }
}

// ── Reading ───────────────────────────────────────────────────────────────────

/// Read persisted rows, checking they are strictly ascending.
///
/// The rows may have gaps: an interrupted run leaves a prefix, and a file from
/// a different range may cover other days.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<DailyStat>> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path).map_err(|e| store_err(path, e))?;
    let mut rows: Vec<DailyStat> = Vec::new();
    for record in reader.deserialize::<DailyStat>() {
        let row = record.map_err(|e| store_err(path, e))?;
        if let Some(prev) = rows.last() {
            if row.date <= prev.date {
                return Err(store_err(
                    path,
                    format!("row {} is not after {}", row.date, prev.date),
                ));
            }
        }
        rows.push(row);
    }
    debug!(rows = rows.len(), path = %path.display(), "read daily rows");
    Ok(rows)
}

// ── Failure log ───────────────────────────────────────────────────────────────

/// Rewrite the failure log with `failures`, removing it when there are none.
pub fn write_failures(path: impl AsRef<Path>, failures: &[DayFailure]) -> Result<()> {
    let path = path.as_ref();
    if failures.is_empty() {
        if path.exists() {
            fs::remove_file(path)?;
        }
        return Ok(());
    }
    let mut writer = Writer::from_path(path).map_err(|e| store_err(path, e))?;
    for failure in failures {
        writer
            .serialize(failure)
            .map_err(|e| store_err(path, e))?;
    }
    writer.flush()?;
    info!("Recorded {} failed days in {}", failures.len(), path.display());
    Ok(())
}

/// Dates listed in a failure log; empty when the log does not exist.
pub fn read_failed_dates(path: impl AsRef<Path>) -> Result<HashSet<NaiveDate>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let mut reader = Reader::from_path(path).map_err(|e| store_err(path, e))?;
    reader
        .deserialize::<DayFailure>()
        .map(|r| r.map(|f| f.date).map_err(|e| store_err(path, e)))
        .collect()
}

// ── Resume ────────────────────────────────────────────────────────────────────

/// Rows from an earlier run in `output_dir` that can be reused for `range`.
///
/// Rows outside the range and rows for days that previously failed to fetch
/// are dropped, so those days are queried again.
pub fn load_resume_rows(output_dir: &Path, range: &DateRange) -> Result<Vec<DailyStat>> {
    let series_path = output_dir.join(DAILY_CSV);
    if !series_path.exists() {
        info!("No previous series at {}; starting fresh", series_path.display());
        return Ok(Vec::new());
    }
    let failed = read_failed_dates(output_dir.join(FAILURES_CSV))?;
    let rows: Vec<DailyStat> = read_rows(&series_path)?
        .into_iter()
        .filter(|r| range.contains(r.date) && !failed.contains(&r.date))
        .collect();
    info!(
        "Resuming with {} stored days ({} previously failed days will be refetched)",
        rows.len(),
        failed.len()
    );
    Ok(rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
