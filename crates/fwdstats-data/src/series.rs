//! Ordered daily series construction.
//!
//! Days are aggregated into pre-allocated slots addressed by their offset in
//! the [`DateRange`]. A slot is written exactly once, and only the contiguous
//! prefix of filled slots is ever handed to a [`SeriesSink`], so persisted
//! output is always in ascending date order regardless of completion order.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use fwdstats_core::error::{FwdStatsError, Result};
use fwdstats_core::models::{DailyStat, DayWindow};
use fwdstats_core::time_utils::{day_window, DateRange};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregator::DailyAggregator;
use crate::source::EventSource;

// ── DailySeries ───────────────────────────────────────────────────────────────

/// Gap-free, strictly ascending run of daily rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DailySeries {
    days: Vec<DailyStat>,
}

impl DailySeries {
    /// Validate that `days` are consecutive calendar days in ascending order.
    pub fn new(days: Vec<DailyStat>) -> Result<Self> {
        for pair in days.windows(2) {
            let (prev, next) = (pair[0].date, pair[1].date);
            if prev.succ_opt() != Some(next) {
                return Err(FwdStatsError::InvalidSeries(format!(
                    "{next} does not directly follow {prev}"
                )));
            }
        }
        Ok(Self { days })
    }

    pub fn days(&self) -> &[DailyStat] {
        &self.days
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DailyStat> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

}

impl<'a> IntoIterator for &'a DailySeries {
    type Item = &'a DailyStat;
    type IntoIter = std::slice::Iter<'a, DailyStat>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.iter()
    }
}

// ── SlotBuffer ────────────────────────────────────────────────────────────────

/// Fixed set of day slots for a [`DateRange`], filled once each.
#[derive(Debug, Clone)]
pub struct SlotBuffer {
    range: DateRange,
    slots: Vec<Option<DailyStat>>,
    /// Number of leading slots already handed out by [`take_ready`].
    ///
    /// [`take_ready`]: SlotBuffer::take_ready
    flushed: usize,
}

impl SlotBuffer {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            slots: vec![None; range.len()],
            flushed: 0,
        }
    }

    /// Store `stat` in the slot for its date.
    ///
    /// Returns `false` and leaves the buffer untouched when the date lies
    /// outside the range or its slot is already filled.
    pub fn fill(&mut self, stat: DailyStat) -> bool {
        let Some(index) = self.range.index_of(stat.date) else {
            warn!(date = %stat.date, "day outside of series range ignored");
            return false;
        };
        if self.slots[index].is_some() {
            warn!(date = %stat.date, "day slot already filled; duplicate ignored");
            return false;
        }
        self.slots[index] = Some(stat);
        true
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| s.is_some())
    }

    /// Rows of the contiguous filled prefix not yet returned by an earlier
    /// call.
    pub fn take_ready(&mut self) -> Vec<DailyStat> {
        let mut ready = Vec::new();
        while let Some(Some(stat)) = self.slots.get(self.flushed) {
            ready.push(*stat);
            self.flushed += 1;
        }
        ready
    }

    /// Finish the buffer. Every slot must be filled.
    pub fn into_series(self) -> Result<DailySeries> {
        let mut days = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(stat) => days.push(stat),
                None => {
                    let missing = self
                        .range
                        .date_at(index)
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| index.to_string());
                    return Err(FwdStatsError::InvalidSeries(format!(
                        "no row for {missing}"
                    )));
                }
            }
        }
        DailySeries::new(days)
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

/// Receiver of completed rows, called in ascending date order.
pub trait SeriesSink {
    fn write_day(&mut self, stat: &DailyStat) -> Result<()>;

    /// Called as soon as a day fails, before its zero row can be written.
    fn record_failure(&mut self, _failure: &DayFailure) -> Result<()> {
        Ok(())
    }
}

impl SeriesSink for Vec<DailyStat> {
    fn write_day(&mut self, stat: &DailyStat) -> Result<()> {
        self.push(*stat);
        Ok(())
    }
}

/// Sink that discards every row.
pub struct NullSink;

impl SeriesSink for NullSink {
    fn write_day(&mut self, _stat: &DailyStat) -> Result<()> {
        Ok(())
    }
}

/// Flush the ready prefix of `buffer` into `sink`.
pub fn flush_ready(buffer: &mut SlotBuffer, sink: &mut dyn SeriesSink) -> Result<usize> {
    let ready = buffer.take_ready();
    for stat in &ready {
        sink.write_day(stat)?;
    }
    Ok(ready.len())
}

// ── Per-day resolution ────────────────────────────────────────────────────────

/// A day whose events could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayFailure {
    pub date: NaiveDate,
    pub error: String,
}

/// Result of resolving one day: the row to store plus the failure, if any.
#[derive(Debug, Clone)]
pub struct DayResult {
    pub stat: DailyStat,
    pub failure: Option<DayFailure>,
}

/// Query and aggregate one day. A failed query yields the zero record and a
/// logged warning; it never aborts the caller.
pub fn resolve_day<S: EventSource + ?Sized>(source: &S, window: &DayWindow) -> DayResult {
    match source.query(window) {
        Ok(events) => {
            debug!(date = %window.date, events = events.len(), "day fetched");
            DayResult {
                stat: DailyAggregator::aggregate(window.date, &events),
                failure: None,
            }
        }
        Err(e) => {
            warn!(date = %window.date, error = %e, "failed to fetch day; recording zero row");
            DayResult {
                stat: DailyStat::zero(window.date),
                failure: Some(DayFailure {
                    date: window.date,
                    error: e.to_string(),
                }),
            }
        }
    }
}

// ── SeriesBuilder ─────────────────────────────────────────────────────────────

/// Everything produced by a collection run.
#[derive(Debug, Clone)]
pub struct SeriesOutcome {
    pub series: DailySeries,
    /// Days that fell back to a zero row, ascending.
    pub failures: Vec<DayFailure>,
    /// Days taken from previously persisted rows instead of being fetched.
    pub reused: usize,
}

/// Slots already known before fetching, plus the days still to fetch.
#[derive(Debug)]
pub struct SeriesPlan {
    pub buffer: SlotBuffer,
    pub pending: Vec<DayWindow>,
    pub reused: usize,
}

/// Drives [`DailyAggregator`] across every day of a range.
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    range: DateRange,
    timezone: Tz,
    known: BTreeMap<NaiveDate, DailyStat>,
}

impl SeriesBuilder {
    pub fn new(range: DateRange, timezone: Tz) -> Self {
        Self {
            range,
            timezone,
            known: BTreeMap::new(),
        }
    }

    /// Seed days that need no fetching, e.g. rows from an earlier run.
    /// Rows outside the range are ignored.
    pub fn with_known(mut self, rows: impl IntoIterator<Item = DailyStat>) -> Self {
        for row in rows {
            if self.range.contains(row.date) {
                self.known.insert(row.date, row);
            }
        }
        self
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Prefill a buffer with the known rows and list the windows to fetch.
    pub fn plan(&self) -> SeriesPlan {
        let mut buffer = SlotBuffer::new(self.range);
        let mut pending = Vec::new();
        let mut reused = 0;
        for date in self.range.days() {
            match self.known.get(&date) {
                Some(stat) => {
                    buffer.fill(*stat);
                    reused += 1;
                }
                None => pending.push(day_window(date, &self.timezone)),
            }
        }
        SeriesPlan {
            buffer,
            pending,
            reused,
        }
    }

    /// Fetch every pending day in order, one query at a time.
    pub fn build<S: EventSource + ?Sized>(
        &self,
        source: &S,
        sink: &mut dyn SeriesSink,
    ) -> Result<SeriesOutcome> {
        self.build_observed(source, sink, |_| {})
    }

    /// As [`build`](Self::build), calling `on_day` after each fetched day.
    pub fn build_observed<S, F>(
        &self,
        source: &S,
        sink: &mut dyn SeriesSink,
        mut on_day: F,
    ) -> Result<SeriesOutcome>
    where
        S: EventSource + ?Sized,
        F: FnMut(&DayResult),
    {
        let SeriesPlan {
            mut buffer,
            pending,
            reused,
        } = self.plan();
        let mut failures = Vec::new();

        flush_ready(&mut buffer, sink)?;
        for window in &pending {
            let result = resolve_day(source, window);
            on_day(&result);
            if let Some(failure) = result.failure {
                sink.record_failure(&failure)?;
                failures.push(failure);
            }
            buffer.fill(result.stat);
            flush_ready(&mut buffer, sink)?;
        }

        Ok(SeriesOutcome {
            series: buffer.into_series()?,
            failures,
            reused,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
