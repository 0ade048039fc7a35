//! Parsing for `perf stat -I` interval logs.

pub mod field;
pub mod line;
pub mod parse;
pub mod time;

pub use parse::{Discard, RecordSink, parse_reader};
