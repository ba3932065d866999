//! Data layer for the forwarding statistics tool.
//!
//! Fetches forwarding events from an [`source::EventSource`], aggregates them
//! into daily and monthly statistics, builds the ordered daily series and
//! persists it as CSV.

pub mod aggregator;
pub mod series;
pub mod source;
pub mod store;

pub use fwdstats_core as core;
