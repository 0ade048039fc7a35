//! Start-time parsing and elapsed-offset to absolute-time conversion.

use chrono::{NaiveDateTime, TimeDelta};

/// `Thu Nov  9 14:58:03 2023` after whitespace runs are collapsed.
const START_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Rendering used for the `utctime` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("cannot parse start time {0:?} (expected e.g. 'Thu Nov 9 14:58:03 2023')")]
    BadStartTime(String),

    #[error("cannot parse elapsed seconds {0:?}")]
    BadElapsed(String),

    #[error("elapsed seconds {0:?} overflow the timestamp range")]
    Overflow(String),
}

/// Parse the text following `started on`.
///
/// perf pads single-digit days with an extra space, so whitespace runs are
/// collapsed before matching.
pub fn parse_start_time(text: &str) -> Result<NaiveDateTime, TimeError> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, START_TIME_FORMAT)
        .map_err(|_| TimeError::BadStartTime(text.to_string()))
}

/// `start + elapsed`, with the elapsed decimal string read as f64 seconds and
/// kept to nanosecond precision.
pub fn synthesize(start: NaiveDateTime, elapsed: &str) -> Result<NaiveDateTime, TimeError> {
    let secs: f64 = elapsed
        .parse()
        .map_err(|_| TimeError::BadElapsed(elapsed.to_string()))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(TimeError::BadElapsed(elapsed.to_string()));
    }

    let nanos = (secs * 1e9).round();
    if nanos > i64::MAX as f64 {
        return Err(TimeError::Overflow(elapsed.to_string()));
    }

    start
        .checked_add_signed(TimeDelta::nanoseconds(nanos as i64))
        .ok_or_else(|| TimeError::Overflow(elapsed.to_string()))
}
