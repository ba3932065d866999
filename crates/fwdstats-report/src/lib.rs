//! Reporting layer: year-in-review summary and daily charts.

pub mod chart;
pub mod extremes;
pub mod summary;

pub use chart::ChartRenderer;
pub use extremes::Extremes;
pub use summary::{SummaryReport, SummaryReporter};
