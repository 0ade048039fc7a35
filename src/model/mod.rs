//! Record model: wide per-timestamp records and run-level metadata.

use crate::stat::time::TIMESTAMP_FORMAT;
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Column holding the synthesized absolute timestamp.
pub const TIME_COLUMN: &str = "utctime";

/// One cell of a wide record.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Time(NaiveDateTime),
    Int(u64),
    Float(f64),
    /// The counter could not be measured for this interval.
    NotCounted,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Time(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            CellValue::Int(n) => write!(f, "{}", n),
            // Debug keeps the trailing ".0" on whole values.
            CellValue::Float(x) => write!(f, "{:?}", x),
            CellValue::NotCounted => f.write_str("NaN"),
        }
    }
}

/// All counter readings sharing one elapsed-seconds string.
///
/// Column order is insertion order and becomes the emitted column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    elapsed: String,
    cells: IndexMap<String, CellValue>,
}

impl SampleRecord {
    /// Open a record; `utctime` is always its first column.
    pub fn open(elapsed: &str, utctime: NaiveDateTime) -> Self {
        let mut cells = IndexMap::new();
        cells.insert(TIME_COLUMN.to_string(), CellValue::Time(utctime));
        Self {
            elapsed: elapsed.to_string(),
            cells,
        }
    }

    /// The raw elapsed-seconds text this record was opened for.
    pub fn elapsed(&self) -> &str {
        &self.elapsed
    }

    /// Insert or overwrite a column; an overwrite keeps the original position.
    pub fn insert(&mut self, key: String, value: CellValue) -> Option<CellValue> {
        self.cells.insert(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Run descriptor found at the summary boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryHeader {
    pub label: String,
    pub runs: u64,
}

/// What one parse learned about the run besides the samples themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub start_time: Option<NaiveDateTime>,
    /// Labels from the column-header comment; informational only.
    pub columns: Vec<String>,
    /// `None` when the log ended before its summary section.
    pub summary: Option<SummaryHeader>,
    pub records: usize,
}
