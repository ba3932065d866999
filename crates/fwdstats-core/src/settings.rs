use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::Parser;
use std::path::PathBuf;

use crate::error::Result;
use crate::time_utils::{parse_date, resolve_timezone, DateRange};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Generate LND daily forwarding CSV, charts, and year-in-review summary
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lnd-fwdstats",
    about = "Generate LND daily forwarding CSV, charts, and year-in-review summary",
    version
)]
pub struct Settings {
    /// Start date YYYY-MM-DD
    #[arg(long)]
    pub start: String,

    /// End date YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub end: String,

    /// Directory to save CSV, charts and summary
    #[arg(long, default_value = "lnd_stats")]
    pub output_dir: PathBuf,

    /// Timezone defining calendar days (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Path to the lncli binary
    #[arg(long, default_value = "lncli", env = "LNCLI")]
    pub lncli: PathBuf,

    /// lnd data directory passed to lncli
    #[arg(long)]
    pub lnddir: Option<PathBuf>,

    /// host:port of the lnd RPC server
    #[arg(long)]
    pub rpcserver: Option<String>,

    /// Bitcoin network passed to lncli
    #[arg(long, value_parser = ["mainnet", "testnet", "testnet4", "signet", "regtest", "simnet"])]
    pub network: Option<String>,

    /// Macaroon file passed to lncli
    #[arg(long)]
    pub macaroonpath: Option<PathBuf>,

    /// Page size for each fwdinghistory query
    #[arg(long, default_value = "50000", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_events: u32,

    /// Number of days fetched in parallel (1-32)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..=32))]
    pub concurrency: u16,

    /// Extra attempts for a failed day query (0-10)
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: u32,

    /// Reuse days already present in the output CSV
    #[arg(long)]
    pub resume: bool,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path (logs go to stderr when absent)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── RunConfig ──────────────────────────────────────────────────────────────────

/// Validated, resolved run parameters derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub range: DateRange,
    pub timezone: Tz,
    pub output_dir: PathBuf,
}

impl Settings {
    /// Validate dates and timezone. Any error here is a configuration error.
    pub fn validate(&self) -> Result<RunConfig> {
        let start: NaiveDate = parse_date(&self.start)?;
        let end: NaiveDate = parse_date(&self.end)?;
        let range = DateRange::new(start, end)?;
        let timezone = resolve_timezone(&self.timezone)?;
        Ok(RunConfig {
            range,
            timezone,
            output_dir: self.output_dir.clone(),
        })
    }

    /// The log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Global lncli flags in the order lncli expects them before the
    /// subcommand.
    pub fn lncli_global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(dir) = &self.lnddir {
            args.push(format!("--lnddir={}", dir.display()));
        }
        if let Some(server) = &self.rpcserver {
            args.push(format!("--rpcserver={}", server));
        }
        if let Some(network) = &self.network {
            args.push(format!("--network={}", network));
        }
        if let Some(mac) = &self.macaroonpath {
            args.push(format!("--macaroonpath={}", mac.display()));
        }
        args
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
