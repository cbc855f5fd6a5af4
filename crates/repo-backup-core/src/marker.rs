//! Timestamp marker file.
//!
//! An append-only text log of run boundaries. Only the first
//! whitespace-delimited token of the last non-blank line is consulted; it is
//! a floating point Unix epoch time. Anything after it on the line is a
//! free-form comment.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Read the lower bound for the next incremental run.
pub fn read_lower_bound(path: &Path) -> Result<DateTime<Utc>> {
    let contents = fs::read_to_string(path).map_err(|e| Error::MalformedTimestampFile {
        path: path.to_path_buf(),
        reason: format!("cannot read file: {}", e),
    })?;
    let bound = parse_lower_bound(&contents).map_err(|reason| Error::MalformedTimestampFile {
        path: path.to_path_buf(),
        reason,
    })?;
    debug!("Lower bound from {}: {}", path.display(), bound);
    Ok(bound)
}

/// Parse marker file contents. Returns the reason on failure.
pub fn parse_lower_bound(contents: &str) -> Result<DateTime<Utc>, String> {
    let last_line = contents
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| "no non-blank line found".to_string())?;
    // A non-blank line always has a first token.
    let token = last_line.split_whitespace().next().unwrap_or_default();
    let seconds: f64 = token
        .parse()
        .map_err(|e| format!("'{}' is not an epoch timestamp: {}", token, e))?;
    epoch_to_datetime(seconds).ok_or_else(|| format!("'{}' is out of range", token))
}

/// Convert epoch seconds to a UTC time at microsecond precision.
pub fn epoch_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

/// Render one marker line: `<epoch>     #  <human readable time>`.
pub fn format_marker_line(captured: DateTime<Utc>) -> String {
    let seconds = captured.timestamp_micros().div_euclid(1_000_000);
    let micros = captured.timestamp_micros().rem_euclid(1_000_000);
    format!(
        "{}.{:06}     #  {}\n",
        seconds,
        micros,
        captured.format("%Y-%m-%d %H:%M:%S%.6f%:z")
    )
}

/// Append the capture time of a finished run. Creates the file if absent and
/// never touches earlier lines.
pub fn record(path: &Path, captured: DateTime<Utc>) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::filesystem(path, e))?;
    file.write_all(format_marker_line(captured).as_bytes())
        .map_err(|e| Error::filesystem(path, e))?;
    info!("Recorded run time {} in {}", captured, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_last_non_blank_line() {
        let contents = "1600000000.0  # first\n1700000000.5  # second\n\n   \n";
        let bound = parse_lower_bound(contents).unwrap();
        assert_eq!(bound.timestamp_micros(), 1_700_000_000_500_000);
    }

    #[test]
    fn test_empty_file_is_malformed() {
        assert!(parse_lower_bound("").is_err());
        assert!(parse_lower_bound("\n  \n\t\n").is_err());
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let err = parse_lower_bound("yesterday # oops\n").unwrap_err();
        assert!(err.contains("yesterday"));
        assert!(parse_lower_bound("NaN\n").is_err());
        assert!(parse_lower_bound("inf\n").is_err());
    }

    #[test]
    fn test_integer_token_is_accepted() {
        let bound = parse_lower_bound("1700000000\n").unwrap();
        assert_eq!(bound.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_marker_line_parses_back_exactly() {
        let captured = DateTime::from_timestamp_micros(1_760_745_600_123_456).unwrap();
        let line = format_marker_line(captured);
        assert!(line.starts_with("1760745600.123456     #  2025-10-18 00:00:00.123456+00:00"));
        assert!(line.ends_with('\n'));
        assert_eq!(parse_lower_bound(&line).unwrap(), captured);
    }
}
