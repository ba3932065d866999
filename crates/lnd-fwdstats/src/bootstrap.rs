use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use fwdstats_core::error::{FwdStatsError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const WRITE_CHECK: &str = ".lnd-fwdstats-write-check";

// ── Output directory ───────────────────────────────────────────────────────────

/// Create `path` (and parents) and check that files can be written in it.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    let output_dir_error = |source: std::io::Error| FwdStatsError::OutputDir {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(path).map_err(output_dir_error)?;

    let check_file = path.join(WRITE_CHECK);
    fs::write(&check_file, b"").map_err(output_dir_error)?;
    fs::remove_file(&check_file).map_err(output_dir_error)?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name onto a `tracing` filter directive.
///
/// `CRITICAL` has no `tracing` counterpart and is treated like `DEBUG`.
/// Unknown names fall back to `info`.
pub fn level_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" | "CRITICAL" => "debug",
        "INFO" => "info",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr, or are appended to `log_file` (without ANSI colours)
/// when one is given.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (stderr_layer, file_layer) = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr);
            (Some(layer), None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
