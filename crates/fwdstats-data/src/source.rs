//! Forwarding-event sources.
//!
//! [`EventSource`] is the seam between the aggregation engine and the node.
//! [`LncliSource`] queries lnd through `lncli fwdinghistory`; closures can
//! stand in for a source in tests or replays.

use std::path::PathBuf;
use std::process::Command;

use fwdstats_core::error::{FwdStatsError, Result};
use fwdstats_core::models::{DayWindow, Event};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

// ── EventSource ───────────────────────────────────────────────────────────────

/// Anything that can list the forwarding events of one day window.
///
/// Queries for different days are independent and idempotent.
pub trait EventSource {
    /// Events settled within `[window.start_ts, window.end_ts)`.
    fn query(&self, window: &DayWindow) -> Result<Vec<Event>>;
}

impl<F> EventSource for F
where
    F: Fn(&DayWindow) -> Result<Vec<Event>>,
{
    fn query(&self, window: &DayWindow) -> Result<Vec<Event>> {
        self(window)
    }
}

// ── LncliSource ───────────────────────────────────────────────────────────────

/// Default page size of one `fwdinghistory` query.
pub const DEFAULT_MAX_EVENTS: u32 = 50_000;

/// Event source backed by the `lncli fwdinghistory` command.
#[derive(Debug, Clone)]
pub struct LncliSource {
    program: PathBuf,
    global_args: Vec<String>,
    max_events: u32,
}

impl LncliSource {
    /// Create a source running `program` with `global_args` placed before the
    /// `fwdinghistory` subcommand.
    pub fn new(program: impl Into<PathBuf>, global_args: Vec<String>, max_events: u32) -> Self {
        Self {
            program: program.into(),
            global_args,
            max_events: max_events.max(1),
        }
    }

    /// Argument list for one page of the given window.
    pub fn page_args(&self, window: &DayWindow, index_offset: u64) -> Vec<String> {
        let mut args = self.global_args.clone();
        args.push("fwdinghistory".to_string());
        args.push(window.start_ts.to_string());
        args.push(window.end_ts.to_string());
        args.push(format!("--max_events={}", self.max_events));
        args.push(format!("--index_offset={}", index_offset));
        args
    }

    fn fetch_page(&self, window: &DayWindow, index_offset: u64) -> Result<ForwardingPage> {
        let args = self.page_args(window, index_offset);
        debug!(program = %self.program.display(), ?args, "running lncli");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| FwdStatsError::SourceSpawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(FwdStatsError::SourceExit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| FwdStatsError::MalformedPayload(format!("non-UTF-8 output: {e}")))?;
        parse_fwdinghistory(&stdout)
    }
}

impl EventSource for LncliSource {
    /// Fetch every page of the window, following `last_offset_index` while
    /// pages come back full.
    fn query(&self, window: &DayWindow) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        let mut offset = 0u64;

        loop {
            let page = self.fetch_page(window, offset)?;
            let page_len = page.events.len();
            events.extend(page.events);

            if page_len < self.max_events as usize {
                break;
            }
            if page.last_offset_index <= offset {
                warn!(
                    date = %window.date,
                    offset,
                    "fwdinghistory returned a full page without advancing; results may be truncated"
                );
                break;
            }
            debug!(date = %window.date, next_offset = page.last_offset_index, "fetching next page");
            offset = page.last_offset_index;
        }

        Ok(events)
    }
}

// ── Payload parsing ───────────────────────────────────────────────────────────

/// One page of `fwdinghistory` output, converted to satoshi events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingPage {
    pub events: Vec<Event>,
    /// Offset to pass as `--index_offset` for the next page.
    pub last_offset_index: u64,
}

#[derive(Deserialize)]
struct FwdingHistoryResponse {
    #[serde(default)]
    forwarding_events: Vec<RawForwardingEvent>,
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    last_offset_index: u64,
}

#[derive(Deserialize)]
struct RawForwardingEvent {
    #[serde(deserialize_with = "u64_from_str_or_num")]
    amt_out_msat: u64,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    fee_msat: u64,
}

/// lnd renders 64-bit integers as JSON strings; accept both forms.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(u64),
    Str(String),
}

fn u64_from_str_or_num<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.trim().parse::<u64>().map_err(serde::de::Error::custom),
    }
}

/// Parse the JSON printed by `lncli fwdinghistory`.
///
/// Milli-satoshi amounts are truncated to whole satoshi.
pub fn parse_fwdinghistory(body: &str) -> Result<ForwardingPage> {
    let response: FwdingHistoryResponse = serde_json::from_str(body)?;
    let events = response
        .forwarding_events
        .into_iter()
        .map(|e| Event::from_msat(e.amt_out_msat, e.fee_msat))
        .collect();
    Ok(ForwardingPage {
        events,
        last_offset_index: response.last_offset_index,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> DayWindow {
        DayWindow {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            start_ts: 1_704_067_200,
            end_ts: 1_704_153_600,
        }
    }

    // ── parse_fwdinghistory ───────────────────────────────────────────────────

    #[test]
    fn test_parse_string_encoded_amounts() {
        let body = r#"{
            "forwarding_events": [
                {"chan_id_in": "1", "amt_out_msat": "1000500", "fee_msat": "1999"},
                {"chan_id_in": "2", "amt_out_msat": "2000000", "fee_msat": "4000"}
            ],
            "last_offset_index": 2
        }"#;
        let page = parse_fwdinghistory(body).unwrap();
        assert_eq!(page.events, vec![Event::new(1000, 1), Event::new(2000, 4)]);
        assert_eq!(page.last_offset_index, 2);
    }

    #[test]
    fn test_parse_numeric_amounts() {
        let body = r#"{"forwarding_events": [{"amt_out_msat": 5000, "fee_msat": 0}], "last_offset_index": "7"}"#;
        let page = parse_fwdinghistory(body).unwrap();
        assert_eq!(page.events, vec![Event::new(5, 0)]);
        assert_eq!(page.last_offset_index, 7);
    }

    #[test]
    fn test_parse_empty_day() {
        let page = parse_fwdinghistory(r#"{"forwarding_events": [], "last_offset_index": 0}"#)
            .unwrap();
        assert!(page.events.is_empty());

        let page = parse_fwdinghistory("{}").unwrap();
        assert!(page.events.is_empty());
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse_fwdinghistory("rpc error: code = Unavailable").unwrap_err();
        assert!(err.is_source_query());
    }

    #[test]
    fn test_parse_non_numeric_amount() {
        let body = r#"{"forwarding_events": [{"amt_out_msat": "lots", "fee_msat": "1"}]}"#;
        assert!(parse_fwdinghistory(body).is_err());
    }

    #[test]
    fn test_parse_missing_amount_field() {
        let body = r#"{"forwarding_events": [{"fee_msat": "1"}]}"#;
        assert!(parse_fwdinghistory(body).is_err());
    }

    // ── LncliSource ───────────────────────────────────────────────────────────

    #[test]
    fn test_page_args_layout() {
        let source = LncliSource::new(
            "lncli",
            vec!["--network=testnet".to_string()],
            DEFAULT_MAX_EVENTS,
        );
        assert_eq!(
            source.page_args(&window(), 0),
            vec![
                "--network=testnet",
                "fwdinghistory",
                "1704067200",
                "1704153600",
                "--max_events=50000",
                "--index_offset=0",
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let source = LncliSource::new("/nonexistent/lncli-binary", Vec::new(), 10);
        let err = source.query(&window()).unwrap_err();
        assert!(matches!(err, FwdStatsError::SourceSpawn { .. }));
        assert!(err.is_source_query());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_carries_stderr() {
        // `false` ignores its arguments and exits with status 1.
        let source = LncliSource::new("false", Vec::new(), 10);
        match source.query(&window()).unwrap_err() {
            FwdStatsError::SourceExit { code, .. } => assert_eq!(code, Some(1)),
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Write an executable shell script standing in for `lncli`. Every call
    /// appends its arguments to `calls.log` next to the script.
    #[cfg(unix)]
    fn fake_lncli(dir: &std::path::Path, responses: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("lncli");
        let script = format!(
            "#!/bin/sh\necho \"$*\" >> \"$(dirname \"$0\")/calls.log\"\ncase \"$*\" in\n{responses}\n*) echo \"unexpected call\" >&2; exit 2 ;;\nesac\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn calls(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_query_follows_full_pages() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let program = fake_lncli(
            tmp.path(),
            r##"*--index_offset=0) echo '{"forwarding_events":[{"amt_out_msat":"1000000","fee_msat":"1000"},{"amt_out_msat":"2000000","fee_msat":"2000"}],"last_offset_index":"2"}' ;;
*--index_offset=2) echo '{"forwarding_events":[{"amt_out_msat":"3000000","fee_msat":"3000"}],"last_offset_index":"3"}' ;;"##,
        );
        let source = LncliSource::new(program, Vec::new(), 2);

        let events = source.query(&window()).unwrap();

        assert_eq!(
            events,
            vec![
                Event::new(1_000, 1),
                Event::new(2_000, 2),
                Event::new(3_000, 3)
            ]
        );
        let calls = calls(tmp.path());
        assert_eq!(calls.len(), 2);
        assert!(calls[0].ends_with("--max_events=2 --index_offset=0"), "{calls:?}");
        assert!(calls[1].ends_with("--max_events=2 --index_offset=2"), "{calls:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_query_stops_when_full_page_does_not_advance() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let program = fake_lncli(
            tmp.path(),
            r##"*--index_offset=0) echo '{"forwarding_events":[{"amt_out_msat":"1000000","fee_msat":"1000"},{"amt_out_msat":"2000000","fee_msat":"2000"}],"last_offset_index":"0"}' ;;"##,
        );
        let source = LncliSource::new(program, Vec::new(), 2);

        let events = source.query(&window()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(calls(tmp.path()).len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_query_fails_when_a_later_page_fails() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let program = fake_lncli(
            tmp.path(),
            r##"*--index_offset=0) echo '{"forwarding_events":[{"amt_out_msat":"1000000","fee_msat":"1000"}],"last_offset_index":"1"}' ;;"##,
        );
        let source = LncliSource::new(program, Vec::new(), 1);

        match source.query(&window()).unwrap_err() {
            FwdStatsError::SourceExit { code, stderr } => {
                assert_eq!(code, Some(2));
                assert_eq!(stderr, "unexpected call");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ── closure sources ───────────────────────────────────────────────────────

    #[test]
    fn test_closure_is_event_source() {
        let source = |w: &DayWindow| -> Result<Vec<Event>> {
            Ok(vec![Event::new((w.end_ts - w.start_ts) as u64, 1)])
        };
        let events = source.query(&window()).unwrap();
        assert_eq!(events, vec![Event::new(86_400, 1)]);
    }
}
