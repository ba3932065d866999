//! Calendar-day handling: date parsing, inclusive date ranges, and the
//! timezone-aware Unix-time window of each day.

use chrono::{Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{FwdStatsError, Result};
use crate::models::DayWindow;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone setting to a [`Tz`]. `"auto"` means the system zone.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    let resolved = if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    };
    resolved
        .parse::<Tz>()
        .map_err(|_| FwdStatsError::InvalidTimezone(resolved))
}

// ── Dates ─────────────────────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| FwdStatsError::InvalidDate(s.to_string()))
}

/// Unix timestamp of local midnight starting `date` in `tz`.
///
/// When midnight is skipped by a DST transition the first existing local
/// time after it is used; when it is repeated the earlier instant wins.
pub fn local_midnight(date: NaiveDate, tz: &Tz) -> i64 {
    let midnight: NaiveDateTime = date.and_time(chrono::NaiveTime::MIN);
    let mut candidate = midnight;
    for _ in 0..=24 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.timestamp(),
            LocalResult::Ambiguous(earliest, _) => return earliest.timestamp(),
            LocalResult::None => {
                debug!(%date, %candidate, "local time skipped by DST, probing forward");
                candidate += Duration::minutes(30);
            }
        }
    }
    // No zone skips a whole day of wall-clock time; fall back to UTC midnight.
    midnight.and_utc().timestamp()
}

/// The half-open window `[date 00:00, date+1 00:00)` in `tz`.
pub fn day_window(date: NaiveDate, tz: &Tz) -> DayWindow {
    let next = date.succ_opt().unwrap_or(date);
    DayWindow {
        date,
        start_ts: local_midnight(date, tz),
        end_ts: local_midnight(next, tz),
    }
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// An inclusive, non-empty range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(FwdStatsError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range, both ends included.
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Always `false`; a range holds at least one day.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Slot index of `date`, if it lies inside the range.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.contains(date)
            .then(|| (date - self.start).num_days() as usize)
    }

    /// The day at slot `index`.
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        if index >= self.len() {
            return None;
        }
        self.start.checked_add_signed(Duration::days(index as i64))
    }

    /// Every day of the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.len())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
