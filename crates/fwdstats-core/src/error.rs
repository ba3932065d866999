use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the forwarding statistics tool.
#[derive(Error, Debug)]
pub enum FwdStatsError {
    /// A date string was not in `YYYY-MM-DD` form.
    #[error("Invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The requested range ends before it starts.
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// A timezone name is not a recognised IANA zone.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The output directory could not be created or written to.
    #[error("Output directory {path} is not writable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The event source process could not be started.
    #[error("Failed to run {program}: {source}")]
    SourceSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The event source process exited unsuccessfully.
    #[error("Event source exited with status {code:?}: {stderr}")]
    SourceExit { code: Option<i32>, stderr: String },

    /// The event source returned a payload that could not be understood.
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A daily series violates ordering: unsorted, duplicated or gapped dates.
    #[error("Invalid daily series: {0}")]
    InvalidSeries(String),

    /// A summary metric has no eligible day to select from.
    #[error("Insufficient data to compute {0}")]
    InsufficientData(String),

    /// The persisted daily series could not be read or written.
    #[error("Daily series store error at {path}: {message}")]
    Store { path: PathBuf, message: String },

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FwdStatsError {
    /// `true` for setup errors that must abort the run before any processing.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FwdStatsError::InvalidDate(_)
                | FwdStatsError::InvalidDateRange { .. }
                | FwdStatsError::InvalidTimezone(_)
                | FwdStatsError::OutputDir { .. }
        )
    }

    /// `true` for per-day fetch failures, which are recovered locally.
    pub fn is_source_query(&self) -> bool {
        matches!(
            self,
            FwdStatsError::SourceSpawn { .. }
                | FwdStatsError::SourceExit { .. }
                | FwdStatsError::MalformedPayload(_)
                | FwdStatsError::JsonParse(_)
        )
    }
}

/// Convenience alias used throughout the workspace crates.
pub type Result<T> = std::result::Result<T, FwdStatsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_error_display_invalid_date() {
        let err = FwdStatsError::InvalidDate("2024/01/01".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid date \"2024/01/01\": expected YYYY-MM-DD"
        );
    }

    #[test]
    fn test_error_display_invalid_range() {
        let err = FwdStatsError::InvalidDateRange {
            start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date range: end 2024-01-01 is before start 2024-02-01"
        );
    }

    #[test]
    fn test_error_display_output_dir() {
        let err = FwdStatsError::OutputDir {
            path: PathBuf::from("/readonly/stats"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/readonly/stats"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_display_source_exit() {
        let err = FwdStatsError::SourceExit {
            code: Some(1),
            stderr: "rpc error: unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Event source exited with status Some(1): rpc error: unavailable"
        );
    }

    #[test]
    fn test_error_display_insufficient_data() {
        let err = FwdStatsError::InsufficientData("highest fee-rate day".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data to compute highest fee-rate day"
        );
    }

    #[test]
    fn test_configuration_classification() {
        assert!(FwdStatsError::InvalidTimezone("Mars/Base".into()).is_configuration());
        assert!(!FwdStatsError::MalformedPayload("x".into()).is_configuration());
        assert!(!FwdStatsError::InsufficientData("x".into()).is_configuration());
    }

    #[test]
    fn test_source_query_classification() {
        assert!(FwdStatsError::SourceExit {
            code: None,
            stderr: String::new()
        }
        .is_source_query());
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        assert!(FwdStatsError::from(json_err).is_source_query());
        assert!(!FwdStatsError::InvalidDate("x".into()).is_source_query());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: FwdStatsError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
