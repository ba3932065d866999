//! Day-count progress for long collection runs.
//!
//! On a terminal the count is drawn as an `indicatif` bar on stderr. When
//! logs go to a file the bar stays hidden and a `N/M days processed` line is
//! logged every [`REPORT_STEP_PCT`] percent instead.

use indicatif::{FormattedDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Percentage step between progress log lines.
const REPORT_STEP_PCT: u64 = 10;

const BAR_TEMPLATE: &str =
    "{bar:40.cyan/blue} {pos}/{len} days processed [{elapsed_precise} elapsed]";

/// How progress is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Draw a bar on stderr.
    Bar,
    /// Keep the bar hidden and log a line every [`REPORT_STEP_PCT`] percent.
    #[default]
    Log,
}

/// Counts processed days of a run.
pub struct Progress {
    bar: ProgressBar,
    mode: ProgressMode,
    next_report_pct: u64,
}

impl Progress {
    /// Start tracking `total` days, of which `already_done` need no work.
    pub fn new(total: usize, already_done: usize, mode: ProgressMode) -> Self {
        let total = total as u64;
        let target = match mode {
            ProgressMode::Bar => ProgressDrawTarget::stderr(),
            ProgressMode::Log => ProgressDrawTarget::hidden(),
        };
        let bar = ProgressBar::with_draw_target(Some(total), target);
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_position((already_done as u64).min(total));

        let mut progress = Self {
            bar,
            mode,
            next_report_pct: REPORT_STEP_PCT,
        };
        progress.skip_passed_steps();
        progress
    }

    pub fn done(&self) -> u64 {
        self.bar.position()
    }

    pub fn total(&self) -> u64 {
        self.bar.length().unwrap_or(0)
    }

    pub fn percent(&self) -> u64 {
        match self.total() {
            0 => 100,
            total => self.done() * 100 / total,
        }
    }

    pub fn line(&self) -> String {
        format!(
            "{}/{} days processed [{} elapsed]",
            self.done(),
            self.total(),
            FormattedDuration(self.bar.elapsed())
        )
    }

    /// Record one more processed day. Returns `true` when a line was logged.
    pub fn advance(&mut self) -> bool {
        if self.done() < self.total() {
            self.bar.inc(1);
        }
        if self.mode == ProgressMode::Log
            && self.percent() >= self.next_report_pct
            && self.done() < self.total()
        {
            tracing::info!("{}", self.line());
            self.skip_passed_steps();
            return true;
        }
        false
    }

    /// Stop the bar and log the closing line.
    pub fn finish(&self) {
        self.bar.finish();
        tracing::info!("{}", self.line());
    }

    fn skip_passed_steps(&mut self) {
        while self.next_report_pct <= self.percent() {
            self.next_report_pct += REPORT_STEP_PCT;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_every_ten_percent() {
        let mut progress = Progress::new(100, 0, ProgressMode::Log);
        let logged = (0..100).filter(|_| progress.advance()).count();
        // 10%, 20%, ..., 90%; the final line comes from finish().
        assert_eq!(logged, 9);
        assert_eq!(progress.done(), 100);
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_small_ranges_report_each_step_once() {
        let mut progress = Progress::new(3, 0, ProgressMode::Log);
        assert!(progress.advance()); // 33%
        assert!(progress.advance()); // 66%
        assert!(!progress.advance()); // done, left to finish()
    }

    #[test]
    fn test_resumed_days_count_as_done() {
        let mut progress = Progress::new(10, 5, ProgressMode::Log);
        assert_eq!(progress.percent(), 50);
        assert!(progress.advance()); // 60%
        assert_eq!(progress.done(), 6);
    }

    #[test]
    fn test_advance_never_exceeds_total() {
        let mut progress = Progress::new(1, 1, ProgressMode::Log);
        progress.advance();
        assert_eq!(progress.done(), 1);
    }

    #[test]
    fn test_bar_mode_logs_no_step_lines() {
        let mut progress = Progress::new(4, 0, ProgressMode::Bar);
        let logged = (0..4).filter(|_| progress.advance()).count();
        assert_eq!(logged, 0);
        assert_eq!(progress.done(), 4);
        progress.finish();
    }

    #[test]
    fn test_line_counts_days() {
        let mut progress = Progress::new(365, 0, ProgressMode::Log);
        progress.advance();
        let line = progress.line();
        assert!(line.starts_with("1/365 days processed ["), "{line}");
        assert!(line.ends_with(" elapsed]"), "{line}");
    }
}
