//! Retry wrapper for event sources.
//!
//! A day query that fails is attempted again up to the configured number of
//! retries, sleeping `backoff × attempt` between attempts (100 ms → 200 ms →
//! …). Only the last error is surfaced.

use std::thread;
use std::time::Duration;

use fwdstats_core::error::Result;
use fwdstats_core::models::{DayWindow, Event};
use fwdstats_data::source::EventSource;

/// Default back-off step between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// [`EventSource`] that retries failed queries on its inner source.
#[derive(Debug, Clone)]
pub struct RetryingSource<S> {
    inner: S,
    /// Total attempts per query, at least 1.
    max_attempts: u32,
    backoff: Duration,
}

impl<S> RetryingSource<S> {
    /// Wrap `inner`, allowing `retries` extra attempts per query.
    pub fn new(inner: S, retries: u32) -> Self {
        Self {
            inner,
            max_attempts: retries.saturating_add(1),
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Override the back-off step.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: EventSource> EventSource for RetryingSource<S> {
    fn query(&self, window: &DayWindow) -> Result<Vec<Event>> {
        let mut attempt = 1;
        loop {
            match self.inner.query(window) {
                Ok(events) => {
                    if attempt > 1 {
                        tracing::debug!(date = %window.date, attempt, "query succeeded after retry");
                    }
                    return Ok(events);
                }
                Err(e) if attempt < self.max_attempts => {
                    let sleep = self.backoff * attempt;
                    tracing::warn!(
                        date = %window.date,
                        attempt,
                        error = %e,
                        sleep_ms = sleep.as_millis() as u64,
                        "query attempt failed; retrying"
                    );
                    thread::sleep(sleep);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
