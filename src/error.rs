//! Typed failures raised while turning a perf-stat log into a table.
//!
//! Every variant is fatal: the input is a finished capture, so nothing is
//! retried or skipped.

use crate::stat::field::FieldError;
use crate::stat::line::LineKind;
use crate::stat::time::TimeError;

/// Why a line was rejected as a format violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatCause {
    #[error("line matches no known shape")]
    Unrecognized,

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Time(#[from] TimeError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A line, or its counter payload, does not fit the interval log dialect.
    #[error("format violation at line {lineno} ({kind}): {cause}: {line:?}")]
    Format {
        lineno: usize,
        kind: LineKind,
        cause: FormatCause,
        line: String,
    },

    /// A sample line arrived before any `started on` comment.
    #[error(
        "ordering violation at line {lineno}: sample line before any 'started on' comment: {line:?}"
    )]
    Ordering { lineno: usize, line: String },

    /// A sealed record carries a column the header row does not have.
    #[error("column divergence in record {record}: unexpected column {key:?} not present in header")]
    ColumnDivergence { record: usize, key: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl ParseError {
    pub(crate) fn format(
        lineno: usize,
        kind: LineKind,
        cause: impl Into<FormatCause>,
        line: &str,
    ) -> Self {
        ParseError::Format {
            lineno,
            kind,
            cause: cause.into(),
            line: line.to_string(),
        }
    }
}
