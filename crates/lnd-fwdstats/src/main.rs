mod bootstrap;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fwdstats_core::settings::{RunConfig, Settings};
use fwdstats_data::series::{SeriesBuilder, SeriesOutcome};
use fwdstats_data::source::LncliSource;
use fwdstats_data::store::{self, OutputFiles, DAILY_CSV};
use fwdstats_report::{ChartRenderer, SummaryReporter};
use fwdstats_runtime::collector::Collector;
use fwdstats_runtime::progress::ProgressMode;
use fwdstats_runtime::retry::RetryingSource;

/// Exit status after Ctrl+C, as a shell would report SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_deref())?;
    tracing::info!("lnd-fwdstats v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings.validate().map_err(|e| {
        tracing::error!("{e}");
        e
    })?;
    bootstrap::ensure_output_dir(&config.output_dir).map_err(|e| {
        tracing::error!("{e}");
        e
    })?;

    tracing::info!(
        "Collecting {} days ({} to {}, timezone {})",
        config.range.len(),
        config.range.start(),
        config.range.end(),
        config.timezone
    );

    let outcome = tokio::select! {
        result = collect(&settings, &config) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(
                "Interrupted; days already written to {} are kept and can be reused with --resume",
                config.output_dir.join(DAILY_CSV).display()
            );
            std::process::exit(INTERRUPTED_EXIT);
        }
    };

    if !settings.no_charts {
        if let Err(e) = ChartRenderer::write_all(&outcome.series, &config.output_dir) {
            tracing::warn!("Chart rendering failed: {e}");
        }
    }

    let report = SummaryReporter::build(&outcome.series)?;
    println!("\n{}", report.render());
    if let Err(e) = SummaryReporter::save(&report, &config.output_dir) {
        tracing::warn!("Could not save year-in-review: {e}");
    }

    Ok(())
}

/// Fetch every day of the range into the daily CSV and record failed days.
async fn collect(settings: &Settings, config: &RunConfig) -> Result<SeriesOutcome> {
    let lncli = LncliSource::new(
        settings.lncli.clone(),
        settings.lncli_global_args(),
        settings.max_events,
    );
    let source = Arc::new(RetryingSource::new(lncli, settings.retries));

    let mut builder = SeriesBuilder::new(config.range, config.timezone);
    if settings.resume {
        builder = builder.with_known(store::load_resume_rows(&config.output_dir, &config.range)?);
    }

    // The bar would never be seen with logs redirected to a file.
    let progress = match settings.log_file {
        Some(_) => ProgressMode::Log,
        None => ProgressMode::Bar,
    };
    let files = OutputFiles::create(&config.output_dir)?;
    let collected = Collector::new(source, builder, usize::from(settings.concurrency))
        .with_progress(progress)
        .run(files)
        .await?;
    let outcome = collected.outcome;

    tracing::info!(
        "CSV generated: {} ({} rows, {} reused)",
        collected.sink.series().path().display(),
        collected.sink.series().rows_written(),
        outcome.reused
    );
    let failure_log = collected.sink.failures().path().to_path_buf();
    drop(collected.sink);
    record_failures(&failure_log, &outcome)?;
    Ok(outcome)
}

/// Rewrite the failure log in date order once the run is complete.
fn record_failures(path: &Path, outcome: &SeriesOutcome) -> Result<()> {
    store::write_failures(path, &outcome.failures)?;
    if !outcome.failures.is_empty() {
        tracing::warn!(
            "{} days could not be fetched and were recorded as zero; see {}",
            outcome.failures.len(),
            path.display()
        );
    }
    Ok(())
}
