//! Runtime layer for the forwarding statistics tool.
//!
//! Drives the per-day collection (sequentially or with parallel workers),
//! retries flaky source queries and reports progress.

pub mod collector;
pub mod progress;
pub mod retry;

pub use fwdstats_core as core;
pub use fwdstats_data as data;
