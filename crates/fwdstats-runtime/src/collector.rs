//! Daily series collection.
//!
//! With a concurrency of 1 the [`SeriesBuilder`] runs sequentially on the
//! blocking pool. With more, a fixed set of tokio workers claim day indices
//! from a shared counter, run the blocking source query on the blocking pool
//! and send each [`DayResult`] back over an `mpsc` channel. The receiving
//! side owns the slot buffer: every slot is written once, and the sink only
//! ever sees the contiguous prefix of finished days, in date order. A failed
//! day reaches the sink's failure log before its zero row does.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fwdstats_core::error::{FwdStatsError, Result};
use fwdstats_core::models::{DailyStat, DayWindow};
use fwdstats_data::series::{
    flush_ready, resolve_day, DayFailure, DayResult, SeriesBuilder, SeriesOutcome, SeriesPlan,
    SeriesSink,
};
use fwdstats_data::source::EventSource;
use tokio::sync::mpsc;

use crate::progress::{Progress, ProgressMode};

// ── Public types ──────────────────────────────────────────────────────────────

/// Outcome of a run together with the sink handed back to the caller.
pub struct Collected<K> {
    pub outcome: SeriesOutcome,
    pub sink: K,
}

/// Runs a [`SeriesBuilder`] against an [`EventSource`].
pub struct Collector<S> {
    source: Arc<S>,
    builder: SeriesBuilder,
    concurrency: usize,
    progress: ProgressMode,
}

impl<S> Collector<S>
where
    S: EventSource + Send + Sync + 'static,
{
    /// Create a collector. A `concurrency` of 0 is treated as 1.
    pub fn new(source: Arc<S>, builder: SeriesBuilder, concurrency: usize) -> Self {
        Self {
            source,
            builder,
            concurrency: concurrency.max(1),
            progress: ProgressMode::default(),
        }
    }

    /// Choose how progress is shown; logged lines by default.
    pub fn with_progress(mut self, mode: ProgressMode) -> Self {
        self.progress = mode;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Collect every day of the builder's range, streaming rows into `sink`.
    pub async fn run<K>(self, sink: K) -> Result<Collected<K>>
    where
        K: SeriesSink + Send + 'static,
    {
        tracing::info!(
            days = self.builder.range().len(),
            concurrency = self.concurrency,
            "collecting daily forwarding history"
        );
        if self.concurrency == 1 {
            self.run_sequential(sink).await
        } else {
            self.run_parallel(sink).await
        }
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn run_sequential<K>(self, mut sink: K) -> Result<Collected<K>>
    where
        K: SeriesSink + Send + 'static,
    {
        let Collector {
            source,
            builder,
            progress: mode,
            ..
        } = self;

        tokio::task::spawn_blocking(move || -> Result<Collected<K>> {
            let total = builder.range().len();
            let mut progress = Progress::new(total, total - builder.plan().pending.len(), mode);
            let outcome = builder.build_observed(&*source, &mut sink, |_| {
                progress.advance();
            })?;
            progress.finish();
            Ok(Collected { outcome, sink })
        })
        .await
        .map_err(|e| FwdStatsError::Other(anyhow_join(e)))?
    }

    async fn run_parallel<K>(self, mut sink: K) -> Result<Collected<K>>
    where
        K: SeriesSink + Send + 'static,
    {
        let SeriesPlan {
            mut buffer,
            pending,
            reused,
        } = self.builder.plan();
        let total = self.builder.range().len();
        let mut progress = Progress::new(total, reused, self.progress);

        flush_ready(&mut buffer, &mut sink)?;

        let pending: Arc<Vec<DayWindow>> = Arc::new(pending);
        let next = Arc::new(AtomicUsize::new(0));
        let worker_count = self.concurrency.min(pending.len());
        let (tx, mut rx) = mpsc::channel::<DayResult>(self.concurrency * 2);

        let mut workers = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let source = Arc::clone(&self.source);
            let pending = Arc::clone(&pending);
            let next = Arc::clone(&next);
            let tx = tx.clone();
            workers.push(tokio::spawn(async move {
                day_worker(worker, source, pending, next, tx).await;
            }));
        }
        drop(tx);

        let mut failures: Vec<DayFailure> = Vec::new();
        while let Some(result) = rx.recv().await {
            progress.advance();
            if let Some(failure) = result.failure {
                sink.record_failure(&failure)?;
                failures.push(failure);
            }
            buffer.fill(result.stat);
            flush_ready(&mut buffer, &mut sink)?;
        }

        for handle in workers {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "collection worker ended abnormally");
            }
        }
        progress.finish();

        failures.sort_by_key(|f| f.date);
        Ok(Collected {
            outcome: SeriesOutcome {
                series: buffer.into_series()?,
                failures,
                reused,
            },
            sink,
        })
    }
}

/// Claim day indices until none are left, sending one result per day.
async fn day_worker<S>(
    worker: usize,
    source: Arc<S>,
    pending: Arc<Vec<DayWindow>>,
    next: Arc<AtomicUsize>,
    tx: mpsc::Sender<DayResult>,
) where
    S: EventSource + Send + Sync + 'static,
{
    loop {
        let index = next.fetch_add(1, Ordering::Relaxed);
        let Some(window) = pending.get(index).copied() else {
            tracing::debug!(worker, "no days left; worker exiting");
            break;
        };

        let day_source = Arc::clone(&source);
        let result = match tokio::task::spawn_blocking(move || resolve_day(&*day_source, &window))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(date = %window.date, error = %e, "day query task failed");
                DayResult {
                    stat: DailyStat::zero(window.date),
                    failure: Some(DayFailure {
                        date: window.date,
                        error: e.to_string(),
                    }),
                }
            }
        };

        if tx.send(result).await.is_err() {
            tracing::debug!(worker, "collector closed; worker exiting");
            break;
        }
    }
}

fn anyhow_join(e: tokio::task::JoinError) -> anyhow::Error {
    anyhow::anyhow!("collection task failed: {e}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
