//! Domain core for the LND forwarding statistics tool.
//!
//! Holds the shared data model, the workspace error type, numeric helpers
//! (percentile / mean / ppm), output formatting, command-line settings and
//! calendar-day time utilities used by every other crate.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
pub mod time_utils;

pub use error::{FwdStatsError, Result};
